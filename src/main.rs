use log::{error, info};
use std::env;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tserve::{
    logging, ConnectionAcceptor, Context, HandlerOutcome, HandlerResult, Request, ServerConfig,
    ServerError, ServerResult, Worker,
};

fn main() -> ServerResult<()> {
    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let config = if args.len() > 1 && Path::new(&args[1]).exists() {
        // Load configuration from file
        ServerConfig::from_json_file(&args[1])?
    } else {
        // Serve the current directory for any host
        ServerConfig::new().with_site("localhost", env::current_dir()?)
    };
    config.validate()?;
    logging::init(&config.log_level)?;

    let address = config.socket_address();
    let acceptor = Arc::new(ConnectionAcceptor::new(&address, config.backlog_size)?);

    info!(
        "Starting server on {} with {} workers",
        address, config.worker_threads
    );

    ctrlc::set_handler(|| {
        info!("Received shutdown signal. Stopping server...");
        std::process::exit(0);
    })
    .map_err(|err| ServerError::Config(format!("failed to set signal handler: {}", err)))?;

    // One worker per thread, each with its own router and context
    let mut handles = Vec::with_capacity(config.worker_threads);
    for id in 0..config.worker_threads {
        let acceptor = acceptor.clone();
        let config = config.clone();
        handles.push(thread::spawn(move || {
            let mut worker = Worker::new(id, &config, describe_request);
            worker.run(&acceptor)
        }));
    }

    for handle in handles {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!("worker stopped: {}", err),
            Err(_) => error!("worker thread panicked"),
        }
    }

    Ok(())
}

/// Stand-in for a real script handler: describes the request and counts
/// visits in the session.
fn describe_request(request: &Request, script: &Path, ctx: &mut Context) -> HandlerResult {
    let visits = {
        let session = ctx.session_start(request);
        let visits = session
            .get("visits")
            .and_then(|value| value.as_u64())
            .unwrap_or(0)
            + 1;
        session.set("visits", visits);
        visits
    };

    let body = format!(
        "<html><body><h1>{}</h1><p>{} {}</p><p>path info: {}</p><p>visits: {}</p></body></html>",
        escape(&script.display().to_string()),
        escape(&request.method),
        escape(&request.target),
        escape(ctx.path_info().unwrap_or("-")),
        visits
    );
    Ok(HandlerOutcome::Complete(body.into_bytes()))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
