//! Roaming discovery and periodic announce (§4.9).
//!
//! Both loops select on a shared shutdown watch channel rather than the
//! donor's direct `tokio::signal::ctrl_c()` call in `main` (generalized
//! here since two independent background loops, not just the HTTP server,
//! need to observe shutdown promptly — §4.10/§5's "single stop_event
//! polled by all background loops").

use rand::Rng;

use pod_core::peers::PeerStore;

use crate::rpc_client;
use crate::state::SharedState;

/// Picks a random last octet within the configured `/24` and a random
/// port from the configured port set, `ping`s, and on success `announce`s
/// and upserts the peer locally. Sleeps uniformly in `[0.5, interval]`
/// seconds between attempts. Exits as soon as `shutdown` fires.
pub async fn roam_discovery(state: SharedState, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    tracing::info!("roaming discovery started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let (host, port) = {
            let mut rng = rand::thread_rng();
            let last_octet: u8 = rng.r#gen();
            let host = format!("{}.{}", state.config.roam.subnet_base, last_octet);
            let port = *state
                .config
                .roam
                .ports
                .get(rng.gen_range(0..state.config.roam.ports.len().max(1)))
                .unwrap_or(&state.config.port);
            (host, port)
        };

        let probe = rpc_client::ping(&state.http_client, &host, port, &state.config.hmac.secret).await;
        if probe.is_ok() {
            let announced = rpc_client::announce(
                &state.http_client,
                &host,
                port,
                &state.config.hmac.secret,
                &state.config.host,
                state.config.port,
            )
            .await;
            if announced.is_ok() {
                if let Err(e) = state.peers.upsert(&host, port) {
                    tracing::warn!(%host, port, error = %e, "failed to record roamed-in peer locally");
                } else {
                    tracing::info!(%host, port, "roaming discovered a new peer");
                }
            }
        }

        let sleep_secs = {
            let mut rng = rand::thread_rng();
            rng.gen_range(0.5..=(state.config.roam.interval_secs as f64).max(0.5))
        };

        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_secs_f64(sleep_secs)) => {}
            _ = shutdown.changed() => break,
        }
    }

    tracing::info!("roaming discovery stopped");
}

/// Iterates every known peer once per `announce_interval_secs` (default
/// 30), sending one signed `announce` per peer; failures are silent.
/// Peers that respond have their `last_seen` refreshed locally.
pub async fn periodic_announce(state: SharedState, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    tracing::info!("periodic announce started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        match state.peers.list() {
            Ok(peers) => {
                state.metrics.node.peers_known.set(peers.len() as i64);
                for peer in peers {
                    let result = rpc_client::announce(
                        &state.http_client,
                        &peer.host,
                        peer.port,
                        &state.config.hmac.secret,
                        &state.config.host,
                        state.config.port,
                    )
                    .await;
                    if result.is_ok() {
                        if let Err(e) = state.peers.upsert(&peer.host, peer.port) {
                            tracing::warn!(host = %peer.host, port = peer.port, error = %e, "failed to refresh peer last_seen");
                        }
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to list known peers"),
        }

        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_secs(state.config.roam.announce_interval_secs.max(1))) => {}
            _ = shutdown.changed() => break,
        }
    }

    tracing::info!("periodic announce stopped");
}
