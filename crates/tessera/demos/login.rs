//! Session login demo.
//!
//! ```text
//! cargo run -p tessera --example login
//! curl -i -X POST localhost:8080/login -d 'name=tom'
//! curl -i localhost:8080/user --cookie 'sessId=...'
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use http::{header, StatusCode};
use serde_json::json;
use tessera::prelude::*;

const LOGIN_PAGE: &str = r#"<form method="post" action="/login">
  <input name="name" placeholder="name">
  <button>Login</button>
</form>"#;

fn login_check(manager: Arc<Manager>) -> impl Middleware {
    FnMiddleware::new("login-check", move |next: HandleFunc| {
        let manager = Arc::clone(&manager);
        handler_fn(move |ctx| {
            let next = Arc::clone(&next);
            let manager = Arc::clone(&manager);
            Box::pin(async move {
                if ctx.path() == "/login" {
                    next(ctx).await;
                    return;
                }
                match manager.get_session(ctx).await {
                    Ok(_) => {
                        if let Err(e) = manager.refresh_session(ctx).await {
                            tracing::warn!(error = %e, "failed to refresh session");
                        }
                        next(ctx).await;
                    }
                    Err(_) => {
                        ctx.writer_mut()
                            .headers_mut()
                            .insert(header::LOCATION, header::HeaderValue::from_static("/login"));
                        ctx.set_resp_status(StatusCode::FOUND);
                    }
                }
            })
        })
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let telemetry = TelemetryConfig {
        logging: tessera::telemetry::LogConfig::development(),
        // Set TESSERA_OTLP=1 with a collector on localhost:4317 to export spans.
        tracing: tessera::telemetry::TracingConfig {
            enabled: std::env::var_os("TESSERA_OTLP").is_some(),
            service_name: "login-demo".to_string(),
            ..Default::default()
        },
        metrics: tessera::telemetry::MetricsConfig {
            enabled: false,
            ..Default::default()
        },
    };
    let _telemetry = init_telemetry(&telemetry).context("failed to initialize telemetry")?;

    let config = ConfigLoader::new()
        .with_dotenv()
        .with_optional_file("tessera.toml")?
        .load()
        .context("invalid server configuration")?;

    let store = Arc::new(MemoryStore::new(Duration::from_secs(15 * 60)));
    let _janitor = store.spawn_janitor(Duration::from_secs(60));
    let manager = Arc::new(Manager::new(store, Arc::new(CookiePropagator::new().http_only(true))));

    let engine = JinjaEngine::new();
    engine.add_template("login.html", LOGIN_PAGE)?;
    engine.add_template("user.html", "<p>Hello, {{ name }}</p>")?;

    let mut builder = ServerBuilder::new(config);
    builder
        .get("/login", handler_fn(|ctx| Box::pin(async move {
            if let Err(e) = ctx.render("login.html", &json!({})) {
                tracing::error!(error = %e, "failed to render login page");
                ctx.set_resp_status(StatusCode::INTERNAL_SERVER_ERROR);
            }
        })))?
        .post("/login", {
            let manager = Arc::clone(&manager);
            handler_fn(move |ctx| {
                let manager = Arc::clone(&manager);
                Box::pin(async move {
                    let Ok(name) = ctx.form_value("name") else {
                        ctx.set_resp_status(StatusCode::BAD_REQUEST);
                        ctx.set_resp_data("name is required");
                        return;
                    };
                    let stored = match manager.init_session(ctx).await {
                        Ok(session) => session.set("name", json!(name)).await,
                        Err(e) => Err(e),
                    };
                    match stored {
                        Ok(()) => ctx.set_resp_data("login succeeded"),
                        Err(e) => {
                            tracing::error!(error = %e, "login failed");
                            ctx.set_resp_status(StatusCode::INTERNAL_SERVER_ERROR);
                        }
                    }
                })
            })
        })?
        .get("/user", {
            let manager = Arc::clone(&manager);
            handler_fn(move |ctx| {
                let manager = Arc::clone(&manager);
                Box::pin(async move {
                    let name = match manager.get_session(ctx).await {
                        Ok(session) => session.get("name").await.unwrap_or_default(),
                        Err(_) => serde_json::Value::Null,
                    };
                    if ctx.render("user.html", &json!({ "name": name })).is_err() {
                        ctx.set_resp_status(StatusCode::INTERNAL_SERVER_ERROR);
                    }
                })
            })
        })?
        .post("/logout", {
            let manager = Arc::clone(&manager);
            handler_fn(move |ctx| {
                let manager = Arc::clone(&manager);
                Box::pin(async move {
                    if let Err(e) = manager.remove_session(ctx).await {
                        tracing::warn!(error = %e, "logout failed");
                    }
                    ctx.set_resp_data("bye");
                })
            })
        })?;

    builder
        .use_middleware(Tracing::new("login-demo"))
        .use_middleware(Recovery::new())
        .use_middleware(AccessLog::new())
        .use_middleware(login_check(Arc::clone(&manager)))
        .template_engine(Arc::new(engine));

    builder.build().run().await?;
    Ok(())
}
