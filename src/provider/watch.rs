use crate::{
    cli::globals::GlobalArgs,
    gatehouse::session::{Session, SessionEvent, SessionStore},
    provider::{auth, ProviderError},
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::time::{interval, sleep, Duration};
use tracing::{debug, error, info, instrument, warn};

/// Resolve the initial session state. A resume token (if configured) is
/// validated against the provider, anything that goes wrong is swallowed
/// and reported as "no session".
#[instrument(skip(globals, store))]
pub async fn bootstrap(globals: &GlobalArgs, store: &SessionStore) {
    let session = match &globals.resume_token {
        Some(token) => match auth::current_user(globals, token).await {
            Ok(principal) => Some(Session {
                access_token: token.clone(),
                principal,
            }),
            Err(e) => {
                debug!("initial session query failed, treating as signed out: {e}");

                None
            }
        },
        None => None,
    };

    if store.feed().send(SessionEvent::Initial(session)).await.is_err() {
        warn!("session store gone before initial resolution");
    }
}

/// Reconcile the session store against the provider for as long as the
/// store is alive. Each tick re-validates the held token: a denial means
/// the remote session is gone, transport errors are retried with backoff
/// and otherwise skipped.
#[instrument(skip(globals, store))]
pub fn spawn(globals: GlobalArgs, store: SessionStore) {
    let mut rng = StdRng::from_entropy();

    let jittered_poll = (globals.poll_interval as f64 * rng.gen_range(0.7..0.9)) as u64;

    let mut poll_interval = interval(Duration::from_secs(jittered_poll.max(1)));

    tokio::spawn(async move {
        loop {
            poll_interval.tick().await;

            let Some(session) = store.current_session() else {
                continue;
            };

            for attempt in 1..=3 {
                let backoff_time = 2u64.pow(attempt - 1);

                if attempt > 1 {
                    warn!("Backing off for {} seconds", backoff_time);
                    sleep(Duration::from_secs(backoff_time)).await;
                }

                match auth::current_user(&globals, &session.access_token).await {
                    Ok(principal) => {
                        debug!("session still valid for {}", principal.email);

                        let refreshed = Session {
                            access_token: session.access_token.clone(),
                            principal,
                        };

                        if store
                            .feed()
                            .send(SessionEvent::Changed(Some(refreshed)))
                            .await
                            .is_err()
                        {
                            return;
                        }

                        break;
                    }

                    Err(ProviderError::Denied { status, .. }) => {
                        info!("remote session no longer valid ({status}), signing out");

                        if store.feed().send(SessionEvent::Changed(None)).await.is_err() {
                            return;
                        }

                        break;
                    }

                    Err(e) => {
                        error!("Error polling session: {}", e);

                        if attempt == 3 {
                            // subscription fails silently when the provider
                            // is unreachable, keep the last known state
                            warn!("provider unreachable after 3 attempts, keeping state");
                        }

                        continue;
                    }
                }
            }
        }
    });
}
