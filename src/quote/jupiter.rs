//! Jupiter aggregator quote client.
//!
//! Two-step flow against the v6 API: `/quote` for the route and amounts,
//! `/swap` for the serialized transaction payload.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{QuoteProvider, SwapQuote, SwapQuoteRequest};
use crate::error::QuoteError;
use crate::model::SOL_MINT;

const DEFAULT_BASE_URL: &str = "https://quote-api.jup.ag/v6";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Priority fee attached to swap transactions, micro-lamports per CU.
const COMPUTE_UNIT_PRICE: u64 = 100_000;

/// Placeholder signer used when no wallet is attached to the quote flow.
const DUMMY_PUBKEY: &str = "11111111111111111111111111111111";

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(rename = "inAmount")]
    in_amount: Option<String>,
    #[serde(rename = "outAmount")]
    out_amount: Option<String>,
    #[serde(rename = "priceImpactPct")]
    price_impact_pct: Option<String>,
    #[serde(flatten)]
    rest: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SwapResponse {
    #[serde(rename = "swapTransaction")]
    swap_transaction: Option<String>,
}

/// HTTP client for the Jupiter quote/swap API.
pub struct JupiterClient {
    client: Client,
    base_url: String,
}

impl JupiterClient {
    /// Create a client against the public v6 endpoint.
    pub fn new() -> Result<Self, QuoteError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a custom endpoint (self-hosted or test).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, QuoteError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| QuoteError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn get_quote(&self, request: &SwapQuoteRequest) -> Result<QuoteResponse, QuoteError> {
        let url = format!("{}/quote", self.base_url);
        debug!(
            input = %request.input_mint,
            output = %request.output_mint,
            amount = request.amount,
            "requesting quote"
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("inputMint", request.input_mint.as_str()),
                ("outputMint", request.output_mint.as_str()),
                ("amount", &request.amount.to_string()),
                ("slippageBps", &request.slippage_bps.to_string()),
                ("onlyDirectRoutes", "false"),
                ("asLegacyTransaction", "false"),
            ])
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(QuoteError::NoRoute(request.output_mint.clone()));
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(QuoteError::Http(format!("quote failed: {status} {body}")));
        }

        response
            .json::<QuoteResponse>()
            .await
            .map_err(|e| QuoteError::InvalidResponse(e.to_string()))
    }

    async fn get_swap_transaction(&self, quote: &QuoteResponse) -> Result<String, QuoteError> {
        let url = format!("{}/swap", self.base_url);
        let body = json!({
            "quoteResponse": {
                "inAmount": quote.in_amount,
                "outAmount": quote.out_amount,
                "priceImpactPct": quote.price_impact_pct,
                // Pass the remainder of the quote through untouched; Jupiter
                // needs the full route plan to build the transaction.
                "rest": quote.rest,
            },
            "userPublicKey": DUMMY_PUBKEY,
            "wrapAndUnwrapSol": true,
            "useSharedAccounts": true,
            "computeUnitPriceMicroLamports": COMPUTE_UNIT_PRICE,
            "asLegacyTransaction": false,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(QuoteError::Http(format!("swap failed: {status} {text}")));
        }

        let swap: SwapResponse = response
            .json()
            .await
            .map_err(|e| QuoteError::InvalidResponse(e.to_string()))?;
        swap.swap_transaction
            .ok_or_else(|| QuoteError::InvalidResponse("no swap transaction in response".into()))
    }
}

#[async_trait]
impl QuoteProvider for JupiterClient {
    async fn quote_and_transaction(
        &self,
        request: &SwapQuoteRequest,
    ) -> Result<SwapQuote, QuoteError> {
        let quote = self.get_quote(request).await?;
        let swap_transaction = self.get_swap_transaction(&quote).await?;

        let parse_u64 = |v: &Option<String>| v.as_deref().and_then(|s| s.parse::<u64>().ok());
        let input_amount = parse_u64(&quote.in_amount).unwrap_or(request.amount);
        let output_amount = parse_u64(&quote.out_amount)
            .ok_or_else(|| QuoteError::InvalidResponse("missing outAmount".into()))?;
        let price_impact_pct = quote
            .price_impact_pct
            .as_deref()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);

        Ok(SwapQuote {
            input_amount,
            output_amount,
            price_impact_pct,
            swap_transaction,
        })
    }

    async fn has_tradable_market(&self, mint: &str) -> Result<bool, QuoteError> {
        // A tiny probe quote SOL -> mint; a NoRoute answer means no market.
        let probe = SwapQuoteRequest {
            input_mint: SOL_MINT.to_string(),
            output_mint: mint.to_string(),
            amount: 100_000_000, // 0.1 SOL
            slippage_bps: 50,
        };
        match self.get_quote(&probe).await {
            Ok(_) => Ok(true),
            Err(QuoteError::NoRoute(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> QuoteError {
    if e.is_timeout() {
        QuoteError::Timeout
    } else {
        QuoteError::Http(e.to_string())
    }
}
