//! Client for a single bitcoind endpoint.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use bitcoin::{block::Header, BlockHash, Transaction, Txid};
use bitcoind_async_client::{
    traits::{Broadcaster, Reader},
    Auth, Client,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};
use zeta_btc_primitives::rpc_types::{
    GetBlockVerboseTxResult, GetNetworkInfoResult, GetTransactionResult, ListUnspentResult,
    TxRawResult,
};

use crate::{
    error::{ClientError, ClientResult},
    traits::BitcoinRpc,
};

/// Number of retries of a call that failed at the transport level.
pub const DEFAULT_MAX_RETRIES: u8 = 3;

/// Delay between two retries, in milliseconds.
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 1_000;

/// Timeout of a single HTTP request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Response {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// A client for one bitcoind endpoint.
///
/// Chain reads, broadcasts and fee estimates go through [`bitcoind_async_client::Client`]. Wallet
/// queries filtered by address, verbose blocks and transactions, the relay fee and address imports
/// are sent as plain JSON-RPC calls on the same endpoint.
///
/// Transport failures are retried `max_retries` times, `retry_interval` apart. Errors returned by
/// the node itself are not retried.
pub struct BitcoinClient {
    url: String,
    inner: Client,
    user: String,
    pass: String,
    http: reqwest::Client,
    next_id: AtomicU64,
    max_retries: u8,
    retry_interval: Duration,
}

impl fmt::Debug for BitcoinClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitcoinClient")
            .field("url", &self.url)
            .field("max_retries", &self.max_retries)
            .field("retry_interval", &self.retry_interval)
            .finish_non_exhaustive()
    }
}

impl BitcoinClient {
    /// Creates a client for the node at `url`, authenticating with `user` and `pass`.
    pub fn new(
        url: impl Into<String>,
        user: impl Into<String>,
        pass: impl Into<String>,
        max_retries: Option<u8>,
        retry_interval_ms: Option<u64>,
    ) -> ClientResult<Self> {
        let url = url.into();
        let user = user.into();
        let pass = pass.into();
        let max_retries = max_retries.unwrap_or(DEFAULT_MAX_RETRIES);
        let retry_interval_ms = retry_interval_ms.unwrap_or(DEFAULT_RETRY_INTERVAL_MS);

        let auth = Auth::UserPass(user.clone(), pass.clone());
        let inner = Client::new(
            url.clone(),
            auth,
            Some(max_retries),
            Some(retry_interval_ms),
            None,
        )?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Transport(format!("could not build http client: {e}")))?;

        Ok(Self {
            url,
            inner,
            user,
            pass,
            http,
            next_id: AtomicU64::new(0),
            max_retries,
            retry_interval: Duration::from_millis(retry_interval_ms),
        })
    }

    /// The URL of the node.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> ClientResult<T> {
        let mut attempt = 0;
        loop {
            match self.call_once(method, params.clone()).await {
                Err(err) if err.is_transport() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(url = %self.url, %method, %err, %attempt, "transport error, retrying");
                    tokio::time::sleep(self.retry_interval).await;
                }
                result => return result,
            }
        }
    }

    async fn call_once<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> ClientResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = Request {
            jsonrpc: "1.0",
            id,
            method,
            params,
        };
        debug!(url = %self.url, %method, %id, "sending rpc request");

        let response = self
            .http
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.pass))
            .json(&request)
            .send()
            .await?;

        // bitcoind reports rpc errors with a 4xx/5xx status and a regular json-rpc body
        let status = response.status();
        let body = response.text().await?;
        let response: Response = match serde_json::from_str(&body) {
            Ok(response) => response,
            Err(_) if !status.is_success() => {
                return Err(ClientError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(error) = response.error {
            return Err(ClientError::Server {
                code: error.code,
                message: error.message,
            });
        }

        Ok(serde_json::from_value(
            response.result.unwrap_or(Value::Null),
        )?)
    }
}

#[async_trait]
impl BitcoinRpc for BitcoinClient {
    async fn get_block_count(&self) -> ClientResult<i64> {
        let count = self.inner.get_block_count().await?;
        i64::try_from(count).map_err(|e| ClientError::Parse(e.to_string()))
    }

    async fn get_block_hash(&self, height: u64) -> ClientResult<BlockHash> {
        Ok(self.inner.get_block_hash(height).await?)
    }

    async fn get_block_header(&self, hash: BlockHash) -> ClientResult<Header> {
        Ok(self.inner.get_block_header(&hash).await?)
    }

    async fn get_block_verbose_tx(&self, hash: BlockHash) -> ClientResult<GetBlockVerboseTxResult> {
        self.call("getblock", vec![json!(hash), json!(2)]).await
    }

    async fn list_unspent(
        &self,
        min_conf: u64,
        max_conf: u64,
        addresses: Vec<String>,
    ) -> ClientResult<Vec<ListUnspentResult>> {
        self.call(
            "listunspent",
            vec![json!(min_conf), json!(max_conf), json!(addresses)],
        )
        .await
    }

    async fn get_transaction(&self, txid: Txid) -> ClientResult<GetTransactionResult> {
        self.call("gettransaction", vec![json!(txid)]).await
    }

    async fn get_raw_transaction(&self, txid: Txid) -> ClientResult<Transaction> {
        Ok(self
            .inner
            .get_raw_transaction_verbosity_zero(&txid)
            .await?
            .0)
    }

    async fn get_raw_transaction_verbose(&self, txid: Txid) -> ClientResult<TxRawResult> {
        self.call("getrawtransaction", vec![json!(txid), json!(true)])
            .await
    }

    async fn send_raw_transaction(&self, tx: Transaction) -> ClientResult<Txid> {
        Ok(self.inner.send_raw_transaction(&tx).await?)
    }

    async fn estimate_smart_fee(&self, conf_target: u16) -> ClientResult<u64> {
        Ok(self.inner.estimate_smart_fee(conf_target).await?)
    }

    async fn get_network_info(&self) -> ClientResult<GetNetworkInfoResult> {
        self.call("getnetworkinfo", vec![]).await
    }

    async fn import_address(&self, address: String) -> ClientResult<()> {
        let _: Value = self
            .call(
                "importaddress",
                vec![json!(address), json!(""), json!(false)],
            )
            .await?;
        Ok(())
    }
}
