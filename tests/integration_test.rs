use study_guide_gen::config::Config;
use study_guide_gen::utils::logging;
use study_guide_gen::{App, GenerateResponse, GenerationOptions, SENTINEL};

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：LLM_API_KEY=... cargo test -- --ignored
async fn test_generate_with_live_backend() {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();

    let app = App::initialize(config).await.expect("初始化应用失败");

    let material = "1. A cart of mass 2 kg is pushed with a constant force of 6 N on a frictionless track.\n\
                    (a) Find the acceleration of the cart.\n\
                    (b) Find how far it travels in the first 3 seconds starting from rest.\n\
                    2. Explain why the same force would produce a smaller acceleration on a heavier cart.";

    let response = app
        .generate(material, "homework", GenerationOptions::default())
        .await;

    match response {
        GenerateResponse::Output { output } => {
            println!("\n========== 生成结果 ==========");
            println!("{}", output);
            println!("==============================\n");
            assert!(output.ends_with(SENTINEL));
            assert_eq!(output.matches(SENTINEL).count(), 1);
        }
        GenerateResponse::Error { error } => panic!("生成失败: {}", error),
    }
}
