use clap::Parser;
use review_etl::utils::error::{EtlError, ErrorSeverity};
use review_etl::utils::{logger, validation::Validate};
use review_etl::{CliConfig, EtlEngine, LocalStorage, ReviewPipeline};

fn exit_code(e: &EtlError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 重試錯誤
        ErrorSeverity::High => 1,     // 處理錯誤
        ErrorSeverity::Critical => 3, // 金鑰或配置錯誤
    }
}

fn report_failure(stage: &str, e: &EtlError) {
    tracing::error!(
        "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
        stage,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建议: {}", e.recovery_suggestion());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose, args.log_format);
    tracing::info!("Starting review-etl");

    let settings = match args.resolve() {
        Ok(settings) => settings,
        Err(e) => {
            report_failure("Configuration", &e);
            std::process::exit(1);
        }
    };
    tracing::debug!("Resolved settings: {:?}", settings);

    // 驗證配置
    if let Err(e) = settings.validate() {
        report_failure("Configuration validation", &e);
        std::process::exit(1);
    }

    if args.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let input = settings.input_file.clone();
    let storage = LocalStorage::new(".".to_string());
    let pipeline = match ReviewPipeline::new(storage, settings) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            report_failure("Client setup", &e);
            std::process::exit(exit_code(&e).max(1));
        }
    };

    let engine = EtlEngine::new_with_monitoring(pipeline, args.monitor).with_input_label(input);

    match engine.run().await {
        Ok(summary) => {
            if summary.failed == 0 {
                println!("✅ 全部处理成功，共处理{}条评论。", summary.rows);
            } else {
                println!(
                    "⚠️ 共处理{}条评论，成功{}条，失败{}条。",
                    summary.rows, summary.succeeded, summary.failed
                );
            }
            println!("🔢 token消耗: {}", summary.total_tokens);
            println!("📁 Output saved to: {}", summary.output_path);
        }
        Err(e) => {
            report_failure("Review classification", &e);

            let code = exit_code(&e);
            if code > 0 {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}
