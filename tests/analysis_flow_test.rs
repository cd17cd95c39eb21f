//! 批量分析流程集成测试
//!
//! 用桩实现替换远程分析服务，验证调度器的分批、降级、
//! 进度上报和结果汇总行为。网络相关的真实测试默认忽略。

use std::path::Path;
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use menu_allergen_scan::{
    AnalysisApi, AnalysisClient, ApiError, App, AppError, BatchAnalysisResponse, BatchScheduler,
    Config, Dish, NullObserver, ProgressObserver,
};

/// 生成 n 道测试菜品
fn make_dishes(n: usize) -> Vec<Dish> {
    (0..n)
        .map(|i| Dish::new(format!("dish-{}", i), vec!["ingredient".to_string()]))
        .collect()
}

/// 间隔为 0 的测试配置
fn test_config(batch_size: usize) -> Config {
    Config {
        batch_size,
        batch_delay_ms: 0,
        ..Config::default()
    }
}

/// 批量请求全部成功的桩，记录每批的大小
struct HappyApi {
    batch_sizes: Mutex<Vec<usize>>,
}

impl HappyApi {
    fn new() -> Self {
        Self {
            batch_sizes: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AnalysisApi for HappyApi {
    async fn analyze_batch(
        &self,
        dishes: &[Dish],
        _user_allergens: &[String],
    ) -> Result<BatchAnalysisResponse, ApiError> {
        self.batch_sizes.lock().unwrap().push(dishes.len());
        let results: Vec<Value> = dishes
            .iter()
            .map(|d| json!({"dish": d.dish_name, "probability_with_any": 12}))
            .collect();
        Ok(BatchAnalysisResponse {
            results,
            processing_time: 0.1,
        })
    }

    async fn analyze_single(
        &self,
        _dish: &Dish,
        _user_allergens: &[String],
    ) -> Result<Value, ApiError> {
        panic!("批量路径成功时不应该走单项分析");
    }
}

/// 批量请求返回 HTTP 500 的桩；单项分析对名字含 "bad" 的菜品失败
struct FailingBatchApi;

#[async_trait]
impl AnalysisApi for FailingBatchApi {
    async fn analyze_batch(
        &self,
        _dishes: &[Dish],
        _user_allergens: &[String],
    ) -> Result<BatchAnalysisResponse, ApiError> {
        Err(ApiError::BadStatus {
            endpoint: "batch_ingredient_analysis".to_string(),
            status: 500,
        })
    }

    async fn analyze_single(
        &self,
        dish: &Dish,
        _user_allergens: &[String],
    ) -> Result<Value, ApiError> {
        if dish.dish_name.contains("bad") {
            Err(ApiError::BadStatus {
                endpoint: "ingredient_analysis".to_string(),
                status: 500,
            })
        } else {
            Ok(json!({"dish": dish.dish_name, "probability_with_any": 33}))
        }
    }
}

/// 批量请求一直不返回的桩（验证超时竞速），单项分析正常
struct SlowBatchApi;

#[async_trait]
impl AnalysisApi for SlowBatchApi {
    async fn analyze_batch(
        &self,
        _dishes: &[Dish],
        _user_allergens: &[String],
    ) -> Result<BatchAnalysisResponse, ApiError> {
        // 远超超时阈值
        tokio::time::sleep(Duration::from_secs(3600)).await;
        unreachable!("超时应该先触发");
    }

    async fn analyze_single(
        &self,
        dish: &Dish,
        _user_allergens: &[String],
    ) -> Result<Value, ApiError> {
        Ok(json!({"dish": dish.dish_name, "probability_with_any": 7}))
    }
}

/// 记录所有进度值和状态切换的观察者
struct RecordingObserver {
    values: Mutex<Vec<u8>>,
    states: Mutex<Vec<bool>>,
}

impl RecordingObserver {
    fn new() -> Self {
        Self {
            values: Mutex::new(Vec::new()),
            states: Mutex::new(Vec::new()),
        }
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_progress(&self, percent: u8) {
        self.values.lock().unwrap().push(percent);
    }

    fn on_analyzing(&self, analyzing: bool) {
        self.states.lock().unwrap().push(analyzing);
    }
}

/// 进入分析状态后阻塞，直到测试放行
struct BlockingObserver {
    started: Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl ProgressObserver for BlockingObserver {
    fn on_analyzing(&self, analyzing: bool) {
        if analyzing {
            if let Some(tx) = self.started.lock().unwrap().take() {
                let _ = tx.send(());
                self.release.lock().unwrap().recv().unwrap();
            }
        }
    }
}

/// App 测试配置：偏好文件不存在（空过敏原列表），提取服务未配置 Key
fn app_config() -> Config {
    Config {
        allergen_store_file: "/nonexistent/allergens.json".to_string(),
        ..Config::default()
    }
}

#[tokio::test]
async fn test_twelve_dishes_make_three_batches() {
    let api = HappyApi::new();
    let config = test_config(5);
    let scheduler = BatchScheduler::new(&api, &config);

    let dishes = make_dishes(12);
    let results = scheduler.run(&dishes, &[], &NullObserver).await;

    // 12 道菜、每批 5 道 → 恰好 3 次批量请求（5、5、2）
    assert_eq!(*api.batch_sizes.lock().unwrap(), vec![5, 5, 2]);

    // 每道菜恰好一条结果，顺序与输入一致
    assert_eq!(results.len(), 12);
    for (dish, result) in dishes.iter().zip(&results) {
        assert_eq!(dish.dish_name, result.dish);
        assert!(result.error.is_none());
    }
}

#[tokio::test(start_paused = true)]
async fn test_delay_between_batches_but_not_after_last() {
    let api = HappyApi::new();
    let config = Config {
        batch_size: 5,
        batch_delay_ms: 200,
        ..Config::default()
    };
    let scheduler = BatchScheduler::new(&api, &config);

    let start = tokio::time::Instant::now();
    let _ = scheduler.run(&make_dishes(12), &[], &NullObserver).await;

    // 3 批之间有 2 次 200ms 间隔，最后一批之后没有
    assert_eq!(start.elapsed(), Duration::from_millis(400));
}

#[tokio::test]
async fn test_http_500_batch_falls_back_to_single_items() {
    let api = FailingBatchApi;
    let config = test_config(5);
    let scheduler = BatchScheduler::new(&api, &config);

    let mut dishes = make_dishes(3);
    dishes.push(Dish::new("bad-dish-a", vec![]));
    dishes.push(Dish::new("bad-dish-b", vec![]));

    let results = scheduler.run(&dishes, &[], &NullObserver).await;

    // 批量失败后仍然为 5 道菜各产出一条结果
    assert_eq!(results.len(), 5);
    for result in &results {
        if result.dish.contains("bad") {
            // 单项也失败的菜品：error 非空、概率归零
            assert!(result.error.as_deref().is_some_and(|e| !e.is_empty()));
            assert_eq!(result.probability_with_any, 0.0);
            assert!(result.probability_breakdown.is_empty());
        } else {
            assert!(result.error.is_none());
            assert_eq!(result.probability_with_any, 33.0);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_batch_times_out_and_falls_back() {
    let api = SlowBatchApi;
    let config = test_config(5);
    let scheduler = BatchScheduler::new(&api, &config);

    let results = scheduler.run(&make_dishes(5), &[], &NullObserver).await;

    assert_eq!(results.len(), 5);
    for result in &results {
        assert!(result.error.is_none());
        assert_eq!(result.probability_with_any, 7.0);
    }
}

#[tokio::test]
async fn test_progress_is_monotonic_and_ends_at_100() {
    let api = HappyApi::new();
    let config = test_config(5);
    let scheduler = BatchScheduler::new(&api, &config);
    let observer = RecordingObserver::new();

    let _ = scheduler.run(&make_dishes(12), &[], &observer).await;

    let values = observer.values.lock().unwrap().clone();
    assert!(!values.is_empty());
    assert!(values.windows(2).all(|w| w[0] <= w[1]), "进度不能回退: {:?}", values);
    assert_eq!(*values.last().unwrap(), 100);
    // 每批开始前上报一次，结束后上报 100：0%、42%（5/12）、83%（10/12）、100%
    assert_eq!(values, vec![0, 42, 83, 100]);
}

#[tokio::test]
async fn test_empty_dish_list_completes_immediately() {
    let api = HappyApi::new();
    let config = test_config(5);
    let scheduler = BatchScheduler::new(&api, &config);
    let observer = RecordingObserver::new();

    let results = scheduler.run(&[], &[], &observer).await;

    assert!(results.is_empty());
    assert!(api.batch_sizes.lock().unwrap().is_empty());
    assert_eq!(*observer.values.lock().unwrap().last().unwrap(), 100);
}

// ========== 整轮分析生命周期 ==========

#[tokio::test]
async fn test_empty_menu_run_still_reports_final_100() {
    let app = App::new(app_config());
    let observer = RecordingObserver::new();

    let run = app.analyze_dishes(Vec::new(), &observer).await.unwrap();

    assert!(run.dishes.is_empty());
    assert!(run.ranked.is_empty());
    // 空菜单也要走完进度上报：最终值必须是 100
    assert_eq!(*observer.values.lock().unwrap().last().unwrap(), 100);
    assert_eq!(*observer.states.lock().unwrap(), vec![true, false]);
    assert!(!app.is_analyzing());
}

#[tokio::test]
async fn test_failed_image_read_clears_busy_flag() {
    let app = App::new(app_config());
    let observer = RecordingObserver::new();

    let err = app
        .analyze_photo(Path::new("/nonexistent/menu.jpg"), &observer)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::ImageRead { .. }));
    // 错误路径同样要清除忙碌标记并通知观察者
    assert!(!app.is_analyzing());
    assert_eq!(*observer.states.lock().unwrap(), vec![true, false]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_second_run_rejected_while_busy() {
    let image_path = std::env::temp_dir().join(format!("menu_photo_{}.jpg", std::process::id()));
    std::fs::write(&image_path, b"fake jpeg bytes").unwrap();

    let app = Arc::new(App::new(app_config()));
    let (started_tx, started_rx) = tokio::sync::oneshot::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let observer = Arc::new(BlockingObserver {
        started: Mutex::new(Some(started_tx)),
        release: Mutex::new(release_rx),
    });

    let task = {
        let app = Arc::clone(&app);
        let observer = Arc::clone(&observer);
        let path = image_path.clone();
        tokio::spawn(async move { app.analyze_photo(&path, observer.as_ref()).await })
    };

    // 等第一轮进入分析状态
    started_rx.await.unwrap();
    assert!(app.is_analyzing());

    // 忙碌期间发起第二轮，必须被拒绝
    let err = app.analyze_dishes(Vec::new(), &NullObserver).await.unwrap_err();
    assert!(matches!(err, AppError::Busy));

    // 放行第一轮：提取服务未配置 API Key，整轮以提取错误收场
    release_tx.send(()).unwrap();
    let result = task.await.unwrap();
    assert!(matches!(result, Err(AppError::Extraction(_))));
    assert!(!app.is_analyzing());

    let _ = std::fs::remove_file(&image_path);
}

// ========== 真实网络测试（默认忽略） ==========

#[tokio::test]
#[ignore] // 需要本地运行分析服务后手动执行：cargo test -- --ignored
async fn test_live_batch_analysis() {
    menu_allergen_scan::logger::init();

    let config = Config::from_env();
    let client = AnalysisClient::new(&config);

    let dishes = vec![Dish::new(
        "Pad Thai",
        vec!["rice noodles".to_string(), "peanuts".to_string()],
    )];
    let response = client
        .analyze_batch(&dishes, &["peanut".to_string()])
        .await
        .expect("批量分析请求失败");

    assert_eq!(response.results.len(), 1);
}
