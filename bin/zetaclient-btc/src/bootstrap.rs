//! Wires the client together and runs it until shutdown is requested.

use std::{fs, path::Path, str::FromStr, sync::Arc};

use anyhow::{bail, Context};
use bitcoin::secp256k1::SecretKey;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{error, info, warn};
use zeta_btc_db::persistent::sqlite::SqliteDb;
use zeta_btc_observer::{load_state, spawn_observer_tasks, BtcObserver, ObserverParams};
use zeta_btc_params::prelude::BtcChain;
use zeta_btc_rpc::{BitcoinClient, BitcoinRpc, RpcFailover};
use zeta_btc_signer::{spawn_scheduler, BtcSigner};
use zeta_btc_state::StateActor;
use zeta_tss::{p2wpkh_address, pubkey_hex, LocalTssSigner, TssSigner};
use zetacore_client::{CoreContextUpdater, CoreSnapshot, HttpZetacoreClient};

use crate::{config::Config, constants::DB_FILE_NAME, params::Params};

/// Starts the observer and the signer of the configured chain, then waits for ctrl-c.
///
/// Returns once every task has stopped or `shutdown_timeout` has elapsed.
pub(crate) async fn run(params: Params, config: Config) -> anyhow::Result<()> {
    let chain = BtcChain::new(params.chain.chain_id(), params.chain.network())
        .context("invalid chain params")?;
    info!(chain = %chain.name(), chain_id = %chain.chain_id(), "starting bitcoin client");

    fs::create_dir_all(&config.datadir).context("could not create datadir")?;
    let db = Arc::new(
        SqliteDb::connect(config.datadir.join(DB_FILE_NAME), config.db.clone())
            .await
            .context("could not open database")?,
    );

    let endpoints = config
        .btc_clients
        .iter()
        .map(|client| {
            BitcoinClient::new(
                &client.url,
                &client.user,
                &client.pass,
                client.retry_count,
                client.retry_interval,
            )
            .map(|client| Arc::new(client) as Arc<dyn BitcoinRpc>)
        })
        .collect::<Result<Vec<_>, _>>()
        .context("could not create bitcoin client")?;
    let rpc = Arc::new(RpcFailover::new(endpoints).context("no bitcoin node configured")?);

    let zetacore = Arc::new(
        HttpZetacoreClient::new(&config.zetacore).context("could not create zetacore client")?,
    );

    let tss = Arc::new(LocalTssSigner::new(read_secret_key(
        &config.tss.secret_key_file,
    )?));
    let tss_pubkey = tss.pubkey();
    let tss_address = p2wpkh_address(&tss_pubkey, chain.network());

    let (updater, context) = CoreContextUpdater::new(zetacore.clone(), CoreSnapshot::default());
    if let Err(err) = updater.refresh().await {
        warn!(%err, "could not load core context, starting with an empty one");
    }
    if let Some(registered) = context.tss_pubkey() {
        if registered.inner != tss_pubkey {
            bail!(
                "signing key {} is not the registered tss key {}",
                pubkey_hex(&tss_pubkey),
                pubkey_hex(&registered.inner)
            );
        }
    }

    let state = load_state(&chain, &tss_address, rpc.as_ref(), db.as_ref())
        .await
        .context("could not load observer state")?;
    info!(%tss_address, last_scanned = %state.last_scanned(), "loaded observer state");

    let cancel = CancellationToken::new();
    let tracker = TaskTracker::new();

    let (actor, state) = StateActor::new(state);
    tracker.spawn(actor.run());
    tracker.spawn(updater.run(
        config.observer.context_refresh_interval,
        cancel.child_token(),
    ));

    let observer = Arc::new(BtcObserver::new(
        ObserverParams {
            chain,
            fee: params.fee,
            compliance: config.compliance.clone(),
            zeta_chain_id: config.observer.zeta_chain_id,
        },
        tss_pubkey,
        rpc,
        zetacore,
        db,
        context,
        state,
    ));
    if let Err(err) = observer.import_tss_address().await {
        error!(%err, "could not import tss address into node wallet");
    }

    spawn_observer_tasks(observer.clone(), &tracker, cancel.child_token());

    let signer = Arc::new(
        BtcSigner::new(observer, tss, config.signer.clone()).context("could not create signer")?,
    );
    spawn_scheduler(signer, &tracker, cancel.child_token());
    tracker.close();

    tokio::signal::ctrl_c()
        .await
        .context("could not listen for shutdown signal")?;
    info!("shutdown requested");
    cancel.cancel();

    if tokio::time::timeout(config.shutdown_timeout, tracker.wait())
        .await
        .is_err()
    {
        warn!(timeout = ?config.shutdown_timeout, "tasks did not stop in time");
    }

    Ok(())
}

fn read_secret_key(path: &Path) -> anyhow::Result<SecretKey> {
    let hex = fs::read_to_string(path)
        .with_context(|| format!("could not read secret key file {}", path.display()))?;

    SecretKey::from_str(hex.trim()).context("invalid secret key")
}
