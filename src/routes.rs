use crate::{
    api::{calculate, results, upload},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use anyhow::{Context, bail};

type LimiterConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-route limiter quotas, built once so every worker shares the same
/// buckets.
pub struct RateLimits {
    upload: LimiterConfig,
    calculate: LimiterConfig,
    read: LimiterConfig,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            upload: build_limiter("RATE_UPLOAD_PER_MIN", config.rate_upload_per_min)?,
            calculate: build_limiter("RATE_CALCULATE_PER_MIN", config.rate_calculate_per_min)?,
            read: build_limiter("RATE_READ_PER_MIN", config.rate_read_per_min)?,
        })
    }
}

fn build_limiter(name: &str, requests_per_min: u32) -> anyhow::Result<LimiterConfig> {
    if requests_per_min == 0 {
        bail!("{} must be greater than 0", name);
    }
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .with_context(|| format!("invalid rate limit for {}", name))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limits: &RateLimits) {
    cfg.service(
        web::scope(&config.api_prefix)
            // /calculate
            .service(
                web::resource("/calculate")
                    .wrap(Governor::new(&limits.calculate))
                    .route(web::post().to(calculate::calculate)),
            )
            // /results
            .service(
                web::resource("/results")
                    .wrap(Governor::new(&limits.read))
                    .route(web::get().to(results::list_results)),
            )
            .service(
                web::scope("/upload")
                    .wrap(Governor::new(&limits.upload))
                    // /upload/salaries
                    .service(
                        web::resource("/salaries").route(web::post().to(upload::upload_salaries)),
                    )
                    // /upload/cities
                    .service(web::resource("/cities").route(web::post().to(upload::upload_cities))),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use crate::store::MemoryStore;
    use actix_web::dev::Service;
    use actix_web::{App, http::StatusCode, test};
    use std::net::SocketAddr;
    use std::sync::Arc;

    fn config(vars: &'static [(&'static str, &'static str)]) -> Config {
        Config::from_lookup(|name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    #[actix_web::test]
    async fn zero_rate_is_rejected() {
        let err = RateLimits::from_config(&config(&[("RATE_READ_PER_MIN", "0")])).err().unwrap();
        assert!(err.to_string().contains("RATE_READ_PER_MIN"));
    }

    #[actix_web::test]
    async fn routes_live_under_the_api_prefix_and_are_limited() {
        let config = config(&[("API_PREFIX", "/v1"), ("RATE_CALCULATE_PER_MIN", "1")]);
        let limits = RateLimits::from_config(&config).unwrap();
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();

        let app_config = config.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AppState::new(Arc::new(MemoryStore::new()))))
                .app_data(web::Data::new(config.clone()))
                .configure(|cfg| configure(cfg, &app_config, &limits)),
        )
        .await;

        let first = test::call_service(
            &app,
            test::TestRequest::post().uri("/v1/calculate").peer_addr(peer).to_request(),
        )
        .await;
        // empty store: routed to the handler, which refuses
        assert_eq!(first.status(), StatusCode::BAD_REQUEST);

        // the limiter answers with an error rather than a response
        let second = app
            .call(test::TestRequest::post().uri("/v1/calculate").peer_addr(peer).to_request())
            .await;
        let status = match second {
            Ok(resp) => resp.status(),
            Err(e) => e.as_response_error().status_code(),
        };
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

        let results = test::call_service(
            &app,
            test::TestRequest::get().uri("/v1/results").peer_addr(peer).to_request(),
        )
        .await;
        assert_eq!(results.status(), StatusCode::OK);
    }
}
