use serde::Deserialize;
use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

use super::types::{
    ApiError, BatchResponse, ControlResponse, RankingResponse, StatsResponse, ViewResponse,
};
use crate::batch::RecordFilter;
use crate::control::{ControlAction, ControlClient, PlaybackSpeed};
use crate::error_handling::types::ControlError;
use crate::view::{RankingRow, SharedDashboard};

/// Largest leaderboard a client may ask for.
pub const MAX_RANKING_SIZE: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct RankingQuery {
    pub k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SpeedQuery {
    pub value: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BatchQuery {
    pub rule_type: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingKind {
    Interfaces,
    Prefixes,
}

/// Leaderboard length for a request: the configured default, or `k` when it
/// lies within 1..=MAX_RANKING_SIZE.
pub fn ranking_size(query: &RankingQuery, default: usize) -> Result<usize, ApiError> {
    match query.k {
        None => Ok(default),
        Some(k) if (1..=MAX_RANKING_SIZE).contains(&k) => Ok(k),
        Some(k) => Err(ApiError {
            message: format!("k must be between 1 and {}, got {}", MAX_RANKING_SIZE, k),
        }),
    }
}

pub fn ranking_response(
    dashboard: &SharedDashboard,
    kind: RankingKind,
    query: &RankingQuery,
) -> Result<RankingResponse, ApiError> {
    let guard = dashboard.lock();
    let k = ranking_size(query, guard.ranking_size())?;
    let rows: Vec<RankingRow> = match kind {
        RankingKind::Interfaces => guard.interface_ranking(k),
        RankingKind::Prefixes => guard.prefix_ranking(k),
    };
    Ok(RankingResponse { k, rows })
}

/// Forwards a playback action to the backend. A reset clears the local view
/// once the backend acknowledged it, before any further record is applied.
pub async fn forward_control(
    client: &ControlClient,
    dashboard: &SharedDashboard,
    action: ControlAction,
) -> Result<ControlResponse, ControlError> {
    client.send(action).await?;
    if action == ControlAction::Reset {
        dashboard.reset();
    }
    Ok(ControlResponse {
        action: action.path(),
        speed: None,
    })
}

pub async fn forward_speed(
    client: &ControlClient,
    query: &SpeedQuery,
) -> Result<ControlResponse, ControlError> {
    let speed = PlaybackSpeed::new(query.value.unwrap_or(f64::NAN))?;
    client.set_speed(speed).await?;
    Ok(ControlResponse {
        action: "speed",
        speed: Some(speed.value()),
    })
}

pub fn batch_response(
    dashboard: &SharedDashboard,
    query: &BatchQuery,
) -> Result<BatchResponse, ApiError> {
    let guard = dashboard.lock();
    let snapshot = guard.batch().ok_or_else(|| ApiError {
        message: "No batch loaded".to_string(),
    })?;
    let filter = RecordFilter::new(query.rule_type.as_deref(), query.search.as_deref());
    Ok(BatchResponse::build(snapshot, &filter))
}

/// Bad input is the client's fault, anything else the backend's.
fn control_error_reply(error: ControlError) -> warp::reply::Response {
    let status = match error {
        ControlError::InvalidSpeed(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    };
    reply::with_status(
        reply::json(&ApiError {
            message: error.to_string(),
        }),
        status,
    )
    .into_response()
}

fn with_dashboard(
    dashboard: SharedDashboard,
) -> impl Filter<Extract = (SharedDashboard,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || dashboard.clone())
}

fn with_control(
    client: ControlClient,
) -> impl Filter<Extract = (ControlClient,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || client.clone())
}

/// GET /api/stats
pub fn stats_route(
    dashboard: SharedDashboard,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "stats")
        .and(warp::get())
        .and(with_dashboard(dashboard))
        .map(|dashboard: SharedDashboard| {
            let stats = StatsResponse::from(dashboard.lock().snapshot());
            reply::with_status(reply::json(&stats), StatusCode::OK)
        })
}

/// GET /api/rankings/interfaces?k=N
pub fn interface_ranking_route(
    dashboard: SharedDashboard,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    ranking_route("interfaces", RankingKind::Interfaces, dashboard)
}

/// GET /api/rankings/prefixes?k=N
pub fn prefix_ranking_route(
    dashboard: SharedDashboard,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    ranking_route("prefixes", RankingKind::Prefixes, dashboard)
}

fn ranking_route(
    segment: &'static str,
    kind: RankingKind,
    dashboard: SharedDashboard,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("api")
        .and(warp::path("rankings"))
        .and(warp::path(segment))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<RankingQuery>())
        .and(with_dashboard(dashboard))
        .map(move |query: RankingQuery, dashboard: SharedDashboard| {
            match ranking_response(&dashboard, kind, &query) {
                Ok(ranking) => {
                    reply::with_status(reply::json(&ranking), StatusCode::OK).into_response()
                }
                Err(error) => reply::with_status(reply::json(&error), StatusCode::BAD_REQUEST)
                    .into_response(),
            }
        })
}

/// GET /api/view
pub fn view_route(
    dashboard: SharedDashboard,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "view")
        .and(warp::get())
        .and(with_dashboard(dashboard))
        .map(|dashboard: SharedDashboard| {
            let view = ViewResponse::build(&dashboard.lock());
            reply::with_status(reply::json(&view), StatusCode::OK)
        })
}

/// GET /api/batch?rule_type=&search=
pub fn batch_route(
    dashboard: SharedDashboard,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "batch")
        .and(warp::get())
        .and(warp::query::<BatchQuery>())
        .and(with_dashboard(dashboard))
        .map(
            |query: BatchQuery, dashboard: SharedDashboard| match batch_response(&dashboard, &query)
            {
                Ok(batch) => reply::with_status(reply::json(&batch), StatusCode::OK).into_response(),
                Err(error) => {
                    reply::with_status(reply::json(&error), StatusCode::NOT_FOUND).into_response()
                }
            },
        )
}

/// GET /api/status, relayed from the backend
pub fn status_route(
    client: ControlClient,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "status")
        .and(warp::get())
        .and(with_control(client))
        .and_then(|client: ControlClient| async move {
            let res = match client.status().await {
                Ok(report) => {
                    reply::with_status(reply::json(&report), StatusCode::OK).into_response()
                }
                Err(e) => control_error_reply(e),
            };
            Ok::<_, Rejection>(res)
        })
}

/// POST /api/control/speed?value=X
pub fn speed_route(
    client: ControlClient,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "control" / "speed")
        .and(warp::post())
        .and(warp::query::<SpeedQuery>())
        .and(with_control(client))
        .and_then(|query: SpeedQuery, client: ControlClient| async move {
            let res = match forward_speed(&client, &query).await {
                Ok(ack) => reply::with_status(reply::json(&ack), StatusCode::OK).into_response(),
                Err(e) => control_error_reply(e),
            };
            Ok::<_, Rejection>(res)
        })
}

/// POST /api/control/{start,pause,resume,reset}
pub fn control_route(
    client: ControlClient,
    dashboard: SharedDashboard,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "control" / String)
        .and(warp::post())
        .and(with_control(client))
        .and(with_dashboard(dashboard))
        .and_then(
            |action: String, client: ControlClient, dashboard: SharedDashboard| async move {
                let Some(action) = ControlAction::from_path(&action) else {
                    let res = reply::with_status(
                        reply::json(&ApiError {
                            message: format!("Unknown control action '{}'", action),
                        }),
                        StatusCode::NOT_FOUND,
                    )
                    .into_response();
                    return Ok::<_, Rejection>(res);
                };

                let res = match forward_control(&client, &dashboard, action).await {
                    Ok(ack) => {
                        reply::with_status(reply::json(&ack), StatusCode::OK).into_response()
                    }
                    Err(e) => control_error_reply(e),
                };
                Ok::<_, Rejection>(res)
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchSnapshot;
    use crate::feed::FeedEvent;
    use crate::record::{Mapping, SavRecord};
    use crate::view::Dashboard;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    const OK: &str = "HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
    const FAILED: &str =
        "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

    // Answers one request with `response` and hands back the request head
    async fn sim_backend(response: &'static str) -> (ControlClient, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });

        (ControlClient::new(&format!("http://{}", addr)), handle)
    }

    fn sav_record(i: u64, rule: i64) -> SavRecord {
        SavRecord {
            record_number: Some(i),
            rule_type: Some(rule),
            rule_type_name: Some(if rule == 0 { "allowlist" } else { "blocklist" }.to_string()),
            target_type: Some(1),
            policy_action: Some(1),
            mappings: vec![Mapping {
                interface_id: i as u32,
                prefix: format!("10.{}.0.0", i),
                prefix_length: 16,
                is_ipv6: false,
            }],
            ..Default::default()
        }
    }

    fn dashboard_with_records(n: u64) -> SharedDashboard {
        let shared = SharedDashboard::new(Dashboard::default().with_limits(10, 3));
        for i in 1..=n {
            shared.apply(FeedEvent::Record(Box::new(sav_record(i, 1))));
        }
        shared
    }

    #[test]
    fn ranking_size_defaults_and_bounds() {
        assert_eq!(ranking_size(&RankingQuery { k: None }, 5).unwrap(), 5);
        assert_eq!(ranking_size(&RankingQuery { k: Some(12) }, 5).unwrap(), 12);
        assert!(ranking_size(&RankingQuery { k: Some(0) }, 5).is_err());
        assert!(ranking_size(&RankingQuery { k: Some(MAX_RANKING_SIZE + 1) }, 5).is_err());
    }

    #[test]
    fn ranking_response_uses_configured_size() {
        let dashboard = dashboard_with_records(6);

        let ranking =
            ranking_response(&dashboard, RankingKind::Interfaces, &RankingQuery::default())
                .unwrap();
        assert_eq!(ranking.k, 3);
        assert_eq!(ranking.rows.len(), 3);
        assert_eq!(ranking.rows[0].key, "1");

        let ranking =
            ranking_response(&dashboard, RankingKind::Prefixes, &RankingQuery { k: Some(10) })
                .unwrap();
        assert_eq!(ranking.rows.len(), 6);
        assert_eq!(ranking.rows[5].key, "10.6.0.0/16");
    }

    #[test]
    fn view_response_reflects_dashboard() {
        let dashboard = dashboard_with_records(4);
        let view = ViewResponse::build(&dashboard.lock());

        assert_eq!(view.stats.total, 4);
        assert_eq!(view.stats.blocklist_hits, 4);
        assert_eq!(view.stats.distinct_prefixes, 4);
        assert_eq!(view.recent_records.len(), 4);
        assert_eq!(view.recent_records[0].record_number, Some(4));
        assert_eq!(view.top_interfaces.len(), 3);
        assert_eq!(view.charts.policy_actions.values, vec![0, 4, 0, 0]);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["playback"], "ready");
        assert_eq!(json["connection"]["state"], "offline");
    }

    #[test]
    fn batch_response_lists_all_filtered_records() {
        let dashboard = SharedDashboard::new(Dashboard::default());
        assert!(batch_response(&dashboard, &BatchQuery::default()).is_err());

        dashboard.lock().load_batch(BatchSnapshot {
            records: (1..=14).map(|i| sav_record(i, (i % 2) as i64)).collect(),
            total_records: Some(14),
            ip_version: Some(6),
            ..Default::default()
        });

        let all = batch_response(&dashboard, &BatchQuery::default()).unwrap();
        // the whole snapshot, not just the ten most recent cards
        assert_eq!(all.matched, 14);
        assert_eq!(all.records.len(), 14);
        assert_eq!(all.total_rules, 14);
        assert_eq!(all.ip_version, "IPv6");

        let filtered = batch_response(
            &dashboard,
            &BatchQuery {
                rule_type: Some("blocklist".to_string()),
                search: Some("10.1".to_string()),
            },
        )
        .unwrap();
        let ids: Vec<u64> = filtered.records.iter().filter_map(|r| r.record_number).collect();
        assert_eq!(ids, vec![1, 11, 13]);
        assert_eq!(filtered.total_records, 14);
    }

    #[tokio::test]
    async fn reset_clears_dashboard_after_backend_ack() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (client, server) = sim_backend(OK).await;
        let dashboard = dashboard_with_records(3);

        let ack = forward_control(&client, &dashboard, ControlAction::Reset)
            .await
            .unwrap();
        assert_eq!(ack.action, "reset");
        assert_eq!(dashboard.stats().total, 0);
        assert!(server.await.unwrap().starts_with("POST /api/control/reset"));
    }

    #[tokio::test]
    async fn failed_reset_keeps_dashboard() {
        let (client, _server) = sim_backend(FAILED).await;
        let dashboard = dashboard_with_records(3);

        let result = forward_control(&client, &dashboard, ControlAction::Reset).await;
        assert!(matches!(result, Err(ControlError::UnexpectedStatus(500))));
        assert_eq!(dashboard.stats().total, 3);
    }

    #[tokio::test]
    async fn pause_leaves_dashboard_untouched() {
        let (client, server) = sim_backend(OK).await;
        let dashboard = dashboard_with_records(2);

        forward_control(&client, &dashboard, ControlAction::Pause)
            .await
            .unwrap();
        assert_eq!(dashboard.stats().total, 2);
        assert!(server.await.unwrap().starts_with("POST /api/control/pause"));
    }

    #[tokio::test]
    async fn speed_is_validated_before_forwarding() {
        let client = ControlClient::new("http://127.0.0.1:9");
        assert!(matches!(
            forward_speed(&client, &SpeedQuery { value: None }).await,
            Err(ControlError::InvalidSpeed(_))
        ));
        assert!(matches!(
            forward_speed(&client, &SpeedQuery { value: Some(-2.0) }).await,
            Err(ControlError::InvalidSpeed(_))
        ));

        let (client, server) = sim_backend(OK).await;
        let ack = forward_speed(&client, &SpeedQuery { value: Some(4.0) })
            .await
            .unwrap();
        assert_eq!(ack.speed, Some(4.0));
        assert!(server
            .await
            .unwrap()
            .starts_with("POST /api/control/speed?value=4"));
    }
}
