//! 로깅 초기화 모듈
//!
//! JSON 형식의 구조화된 로깅을 제공합니다.
//! stdout과 (선택적으로) 일별 로그 파일에 동시 출력합니다.

use std::path::Path;

use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,pamsignal=debug";

/// 로깅 시스템을 초기화합니다.
///
/// JSON 포맷으로 로그를 출력하며, 환경 변수 `RUST_LOG`를 통해 로그 레벨을 설정할 수 있습니다.
/// 기본값은 `info,pamsignal=debug`입니다.
///
/// `log_dir`가 주어지면 해당 디렉토리의 일별 파일(`pamsignal.log.YYYY-MM-DD`)에도 출력합니다.
/// 반환되는 `WorkerGuard`를 main에서 유지해야 종료 시 버퍼링된 로그가 손실되지 않습니다.
pub fn init_logging(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stdout_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_current_span(true)
        .flatten_event(false);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let file_appender = rolling::daily(dir, "pamsignal.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .json()
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_current_span(true)
                .flatten_event(false)
                .with_ansi(false)
                .with_writer(non_blocking);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();

    if let Err(err) = result {
        // source를 다운캐스트해 "이미 초기화됨" 여부를 확인
        use std::error::Error;
        let already_set = err
            .source()
            .and_then(|s| s.downcast_ref::<tracing::dispatcher::SetGlobalDefaultError>())
            .is_some();
        if !already_set {
            eprintln!("Failed to initialize tracing: {}", err);
        }
    }

    guard
}
