//! [`ZetacoreClient`] over the consensus chain's REST gateway.
//!
//! Queries go to the gateway. Votes and trackers are forwarded as JSON to a transaction
//! broadcaster that signs them with the observer's operator key.

use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use bitcoin::PublicKey;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;
use zeta_btc_params::prelude::{ChainParams, CrosschainFlags};

use crate::{
    client::ZetacoreClient,
    errors::{ZetacoreError, ZetacoreResult},
    types::{
        CrossChainTx, InboundTracker, MsgAddBlockHeader, MsgVoteGasPrice, MsgVoteInbound,
        MsgVoteOutbound, OutboundTracker, PendingNonces, VoteResponse,
    },
};

/// Default timeout of a request, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Endpoints of the consensus chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZetacoreConfig {
    /// Base URL of the REST gateway.
    pub api_url: String,

    /// URL the votes are posted to.
    pub broadcaster_url: String,

    /// Request timeout, in seconds.
    pub timeout: Option<u64>,
}

/// A [`ZetacoreClient`] talking HTTP.
#[derive(Debug, Clone)]
pub struct HttpZetacoreClient {
    http: reqwest::Client,
    api_url: String,
    broadcaster_url: String,
}

#[derive(Debug, Serialize)]
struct Broadcast<'a, T> {
    #[serde(rename = "type")]
    kind: &'a str,
    msg: T,
}

#[derive(Debug, Deserialize)]
struct BroadcastResponse {
    #[serde(default)]
    tx_hash: String,
    #[serde(default)]
    ballot: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CctxResponse {
    #[serde(rename = "CrossChainTx")]
    cctx: CrossChainTx,
}

#[derive(Debug, Deserialize)]
struct PendingCctxResponse {
    #[serde(rename = "CrossChainTx", default)]
    cctxs: Vec<CrossChainTx>,
}

#[derive(Debug, Deserialize)]
struct OutboundTrackersResponse {
    #[serde(rename = "outTxTracker", default)]
    trackers: Vec<OutboundTracker>,
}

#[derive(Debug, Deserialize)]
struct InboundTrackersResponse {
    #[serde(rename = "inTxTracker", default)]
    trackers: Vec<InboundTracker>,
}

#[derive(Debug, Deserialize)]
struct PendingNoncesResponse {
    pending_nonces: PendingNonces,
}

#[derive(Debug, Deserialize)]
struct ObserversResponse {
    #[serde(default)]
    observers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChainParamsList {
    #[serde(default)]
    chain_params: Vec<ChainParams>,
}

#[derive(Debug, Deserialize)]
struct ChainParamsResponse {
    chain_params: ChainParamsList,
}

#[derive(Debug, Deserialize)]
struct FlagsResponse {
    #[serde(rename = "crosschainFlags")]
    flags: CrosschainFlags,
}

#[derive(Debug, Deserialize)]
struct Tss {
    tss_pubkey: String,
}

#[derive(Debug, Deserialize)]
struct TssResponse {
    #[serde(rename = "TSS")]
    tss: Tss,
}

#[derive(Debug, Deserialize)]
struct Header {
    height: String,
}

#[derive(Debug, Deserialize)]
struct Block {
    header: Header,
}

#[derive(Debug, Deserialize)]
struct LatestBlockResponse {
    block: Block,
}

impl HttpZetacoreClient {
    /// Creates a client from its endpoints.
    pub fn new(config: &ZetacoreConfig) -> ZetacoreResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                config.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .map_err(|e| ZetacoreError::Transport(format!("could not build http client: {e}")))?;

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            broadcaster_url: config.broadcaster_url.clone(),
        })
    }

    async fn query<T: DeserializeOwned>(&self, path: &str) -> ZetacoreResult<T> {
        let url = format!("{}{path}", self.api_url);
        debug!(%url, "querying consensus chain");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        match status {
            s if s.is_success() => Ok(serde_json::from_str(&body)?),
            StatusCode::NOT_FOUND => Err(ZetacoreError::NotFound(path.to_string())),
            s => Err(ZetacoreError::Status {
                status: s.as_u16(),
                body,
            }),
        }
    }

    async fn broadcast<T: Serialize + Send + Sync>(
        &self,
        kind: &str,
        msg: T,
    ) -> ZetacoreResult<VoteResponse> {
        debug!(%kind, "broadcasting message");

        let response = self
            .http
            .post(&self.broadcaster_url)
            .json(&Broadcast { kind, msg })
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ZetacoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: BroadcastResponse = serde_json::from_str(&body)?;
        if let Some(error) = response.error {
            return Err(ZetacoreError::Rejected(error));
        }

        Ok(VoteResponse {
            zeta_tx_hash: response.tx_hash,
            ballot: response.ballot,
        })
    }
}

#[derive(Debug, Serialize)]
struct AddOutboundTracker {
    chain_id: i64,
    nonce: u64,
    tx_hash: String,
}

#[async_trait]
impl ZetacoreClient for HttpZetacoreClient {
    async fn post_vote_inbound(&self, msg: MsgVoteInbound) -> ZetacoreResult<VoteResponse> {
        self.broadcast("vote_inbound", msg).await
    }

    async fn post_vote_outbound(&self, msg: MsgVoteOutbound) -> ZetacoreResult<VoteResponse> {
        self.broadcast("vote_outbound", msg).await
    }

    async fn post_gas_price(&self, msg: MsgVoteGasPrice) -> ZetacoreResult<String> {
        Ok(self.broadcast("vote_gas_price", msg).await?.zeta_tx_hash)
    }

    async fn post_block_header(&self, msg: MsgAddBlockHeader) -> ZetacoreResult<String> {
        Ok(self.broadcast("add_block_header", msg).await?.zeta_tx_hash)
    }

    async fn add_outbound_tracker(
        &self,
        chain_id: i64,
        nonce: u64,
        tx_hash: String,
    ) -> ZetacoreResult<String> {
        let msg = AddOutboundTracker {
            chain_id,
            nonce,
            tx_hash,
        };
        Ok(self.broadcast("add_outbound_tracker", msg).await?.zeta_tx_hash)
    }

    async fn get_cctx_by_nonce(&self, chain_id: i64, nonce: u64) -> ZetacoreResult<CrossChainTx> {
        let response: CctxResponse = self
            .query(&format!("/zeta-chain/crosschain/cctx/{chain_id}/{nonce}"))
            .await?;
        Ok(response.cctx)
    }

    async fn get_outbound_trackers(&self, chain_id: i64) -> ZetacoreResult<Vec<OutboundTracker>> {
        let response: OutboundTrackersResponse = self
            .query(&format!("/zeta-chain/crosschain/outTxTrackerByChain/{chain_id}"))
            .await?;

        let mut trackers = response.trackers;
        trackers.sort_by_key(|tracker| tracker.nonce);
        Ok(trackers)
    }

    async fn get_inbound_trackers(&self, chain_id: i64) -> ZetacoreResult<Vec<InboundTracker>> {
        let response: InboundTrackersResponse = self
            .query(&format!("/zeta-chain/crosschain/inTxTrackerAllByChain/{chain_id}"))
            .await?;
        Ok(response.trackers)
    }

    async fn get_pending_nonces(&self, chain_id: i64) -> ZetacoreResult<PendingNonces> {
        let response: PendingNoncesResponse = self
            .query(&format!("/zeta-chain/observer/pendingNonces/{chain_id}"))
            .await?;
        Ok(response.pending_nonces)
    }

    async fn list_pending_cctx(&self, chain_id: i64) -> ZetacoreResult<Vec<CrossChainTx>> {
        let response: PendingCctxResponse = self
            .query(&format!("/zeta-chain/crosschain/pendingCctx/{chain_id}"))
            .await?;
        Ok(response.cctxs)
    }

    async fn get_observer_list(&self) -> ZetacoreResult<Vec<String>> {
        let response: ObserversResponse = self.query("/zeta-chain/observer/observer_set").await?;
        Ok(response.observers)
    }

    async fn get_chain_params(&self) -> ZetacoreResult<Vec<ChainParams>> {
        let response: ChainParamsResponse =
            self.query("/zeta-chain/observer/get_chain_params").await?;
        Ok(response.chain_params.chain_params)
    }

    async fn get_crosschain_flags(&self) -> ZetacoreResult<CrosschainFlags> {
        let response: FlagsResponse = self.query("/zeta-chain/observer/crosschain_flags").await?;
        Ok(response.flags)
    }

    async fn get_tss_pubkey(&self) -> ZetacoreResult<PublicKey> {
        let response: TssResponse = self.query("/zeta-chain/observer/TSS").await?;
        PublicKey::from_str(&response.tss.tss_pubkey)
            .map_err(|e| ZetacoreError::Decode(format!("tss pubkey: {e}")))
    }

    async fn get_block_height(&self) -> ZetacoreResult<i64> {
        let response: LatestBlockResponse = self
            .query("/cosmos/base/tendermint/v1beta1/blocks/latest")
            .await?;
        response
            .block
            .header
            .height
            .parse()
            .map_err(|e| ZetacoreError::Decode(format!("block height: {e}")))
    }
}
