//! The dispatch strategy: ordered attempts, classification, fallback
//!
//! Attempt-plan policy:
//! - `table` and `accurate`: every configured account is eligible, order
//!   randomized per invocation to spread load across accounts
//! - `basic`: only the second configured account (usage segregation);
//!   without a second account the mode is skipped entirely
//! - a missing account index never counts as a failed attempt

use std::sync::Arc;

use baidu_auth::{Account, TokenCache};
use provider::{ErrorClass, MODE_CHAIN, Mode, Recognition, Recognizer};
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::classify::{classify_code, suggestion_for};

/// Outcome of a single (mode, account) attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Provider accepted the image — terminal
    Success(Recognition),
    /// Rate/quota limit on this pair — try the next one
    Retryable { code: i64, message: String },
    /// Pair-independent defect — abort the whole chain
    NonRetryable { code: i64, message: String },
    /// Token acquisition or transport failed for this pair only
    Failed { reason: String },
}

/// A successful dispatch, tagged with the winning pair.
#[derive(Debug)]
pub struct DispatchSuccess {
    /// `"{mode}_acc{index}"`, e.g. `table_acc1`
    pub strategy_used: String,
    /// Raw provider payload, passed through untouched
    pub result: serde_json::Value,
}

/// A classified dispatch failure. The transport layer maps these to
/// status codes; nothing escapes the core as an uncaught fault.
#[derive(Debug, thiserror::Error)]
pub enum DispatchFailure {
    #[error("no accounts configured")]
    NoAccounts,

    #[error("provider rejected the request ({code}): {message}")]
    NonRetryable { code: i64, message: String },

    #[error("all strategies failed")]
    Exhausted { last: Option<(i64, String)> },
}

impl DispatchFailure {
    /// Machine-readable code for the response body. Provider codes pass
    /// through; -1 marks an exhausted chain with no provider response and
    /// -3 a configuration failure.
    pub fn error_code(&self) -> i64 {
        match self {
            DispatchFailure::NoAccounts => -3,
            DispatchFailure::NonRetryable { code, .. } => *code,
            DispatchFailure::Exhausted { last } => last.as_ref().map_or(-1, |(code, _)| *code),
        }
    }

    pub fn message(&self) -> String {
        match self {
            DispatchFailure::NoAccounts => "no accounts configured".into(),
            DispatchFailure::NonRetryable { message, .. } => message.clone(),
            DispatchFailure::Exhausted { last } => match last {
                Some((_, message)) => format!("all strategies failed, last error: {message}"),
                None => "all strategies failed, no attempt reached the provider".into(),
            },
        }
    }

    pub fn suggestion(&self) -> &'static str {
        match self {
            DispatchFailure::NoAccounts => "service is misconfigured, contact the operator",
            DispatchFailure::NonRetryable { code, .. } => suggestion_for(Some(*code)),
            DispatchFailure::Exhausted { last } => {
                suggestion_for(last.as_ref().map(|(code, _)| *code))
            }
        }
    }
}

/// Owns the attempt sequence for one gateway process. The account list is
/// immutable for the process lifetime; the token cache and recognizer are
/// shared across concurrent requests.
pub struct Strategy {
    accounts: Vec<Account>,
    tokens: Arc<TokenCache>,
    recognizer: Arc<dyn Recognizer>,
}

impl Strategy {
    pub fn new(
        accounts: Vec<Account>,
        tokens: Arc<TokenCache>,
        recognizer: Arc<dyn Recognizer>,
    ) -> Self {
        Self {
            accounts,
            tokens,
            recognizer,
        }
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Build the ordered (mode, account index) attempt sequence for one
    /// invocation. Randomized where the policy allows, so two plans for
    /// the same input may differ.
    pub fn plan(&self, force_mode: Option<Mode>) -> Vec<(Mode, usize)> {
        let modes: &[Mode] = match force_mode {
            Some(ref m) => std::slice::from_ref(m),
            None => &MODE_CHAIN,
        };

        let mut pairs = Vec::new();
        for &mode in modes {
            match mode {
                Mode::Table | Mode::Accurate => {
                    let mut indices: Vec<usize> = (0..self.accounts.len()).collect();
                    indices.shuffle(&mut rand::rng());
                    pairs.extend(indices.into_iter().map(|i| (mode, i)));
                }
                Mode::Basic => {
                    // Segregation policy: basic runs only on account 1.
                    if self.accounts.len() >= 2 {
                        pairs.push((mode, 1));
                    }
                }
            }
        }
        pairs
    }

    /// Run the fallback chain: first success wins, retryable failures
    /// advance, anything else aborts.
    pub async fn run(
        &self,
        image: &str,
        force_mode: Option<Mode>,
    ) -> Result<DispatchSuccess, DispatchFailure> {
        if self.accounts.is_empty() {
            return Err(DispatchFailure::NoAccounts);
        }

        let mut last: Option<(i64, String)> = None;

        for (mode, index) in self.plan(force_mode) {
            // Bounds guard; a skipped pair is not a failed attempt.
            let Some(account) = self.accounts.get(index) else {
                continue;
            };

            debug!(mode = mode.as_str(), account = %account.label(), "trying strategy");
            let outcome = self.attempt(mode, account, image).await;
            record_attempt(mode, &outcome);

            match outcome {
                AttemptOutcome::Success(recognition) => {
                    let strategy_used = format!("{}_{}", mode.as_str(), account.label());
                    info!(strategy = %strategy_used, "recognition succeeded");
                    return Ok(DispatchSuccess {
                        strategy_used,
                        result: recognition.into_inner(),
                    });
                }
                AttemptOutcome::Retryable { code, message } => {
                    warn!(
                        mode = mode.as_str(),
                        account = %account.label(),
                        code,
                        error = %message,
                        "rate limited, advancing to next pair"
                    );
                    last = Some((code, message));
                }
                AttemptOutcome::NonRetryable { code, message } => {
                    warn!(
                        mode = mode.as_str(),
                        account = %account.label(),
                        code,
                        error = %message,
                        "non-retryable provider error, aborting chain"
                    );
                    return Err(DispatchFailure::NonRetryable { code, message });
                }
                AttemptOutcome::Failed { reason } => {
                    warn!(
                        mode = mode.as_str(),
                        account = %account.label(),
                        error = %reason,
                        "attempt failed before provider decision, advancing"
                    );
                }
            }
        }

        Err(DispatchFailure::Exhausted { last })
    }

    async fn attempt(&self, mode: Mode, account: &Account, image: &str) -> AttemptOutcome {
        let token = match self.tokens.token(account).await {
            Ok(token) => token,
            Err(e) => {
                return AttemptOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let recognition = match self.recognizer.recognize(mode, &token, image).await {
            Ok(recognition) => recognition,
            Err(e) => {
                return AttemptOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        if recognition.is_success() {
            return AttemptOutcome::Success(recognition);
        }

        let code = recognition.error_code().unwrap_or(-1);
        let message = recognition.error_message().unwrap_or("Unknown").to_owned();
        match classify_code(code) {
            ErrorClass::Retryable => AttemptOutcome::Retryable { code, message },
            ErrorClass::NonRetryable => AttemptOutcome::NonRetryable { code, message },
        }
    }
}

fn record_attempt(mode: Mode, outcome: &AttemptOutcome) {
    let label = match outcome {
        AttemptOutcome::Success(_) => "success",
        AttemptOutcome::Retryable { .. } => "retryable",
        AttemptOutcome::NonRetryable { .. } => "non_retryable",
        AttemptOutcome::Failed { .. } => "failed",
    };
    metrics::counter!(
        "dispatch_attempts_total",
        "mode" => mode.as_str(),
        "outcome" => label
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use baidu_auth::{TokenExchange, TokenResponse, parse_accounts};
    use provider::ProviderError;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    /// Exchange that mints `tok_{ak}` tokens, optionally failing for
    /// specific access keys.
    struct TestExchange {
        fail_keys: Vec<String>,
    }

    impl TestExchange {
        fn ok() -> Self {
            Self { fail_keys: vec![] }
        }

        fn failing_for(key: &str) -> Self {
            Self {
                fail_keys: vec![key.to_owned()],
            }
        }
    }

    impl TokenExchange for TestExchange {
        fn exchange<'a>(
            &'a self,
            access_key: &'a str,
            _secret_key: &'a str,
        ) -> Pin<Box<dyn Future<Output = baidu_auth::Result<TokenResponse>> + Send + 'a>> {
            Box::pin(async move {
                if self.fail_keys.iter().any(|k| k == access_key) {
                    return Err(baidu_auth::Error::MissingToken("unknown client id".into()));
                }
                Ok(TokenResponse {
                    access_token: format!("tok_{access_key}"),
                    expires_in: Some(3600),
                })
            })
        }
    }

    /// Recognizer that replays scripted responses in order and records
    /// every (mode, token) it was called with.
    struct ScriptedRecognizer {
        responses: Mutex<VecDeque<provider::Result<Recognition>>>,
        calls: Mutex<Vec<(Mode, String)>>,
    }

    impl ScriptedRecognizer {
        fn new(responses: Vec<provider::Result<Recognition>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(Mode, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Recognizer for ScriptedRecognizer {
        fn id(&self) -> &str {
            "scripted"
        }

        fn recognize<'a>(
            &'a self,
            mode: Mode,
            token: &'a str,
            _image: &'a str,
        ) -> Pin<Box<dyn Future<Output = provider::Result<Recognition>> + Send + 'a>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push((mode, token.to_owned()));
                self.responses
                    .lock()
                    .unwrap()
                    .pop_front()
                    .expect("recognizer called more times than scripted")
            })
        }
    }

    fn ok_body() -> provider::Result<Recognition> {
        Ok(Recognition::new(
            json!({"words_result": [{"words": "hello"}], "words_result_num": 1}),
        ))
    }

    fn error_body(code: i64) -> provider::Result<Recognition> {
        Ok(Recognition::new(
            json!({"error_code": code, "error_msg": format!("provider error {code}")}),
        ))
    }

    fn strategy_with(
        accounts: &str,
        recognizer: Arc<ScriptedRecognizer>,
        exchange: TestExchange,
    ) -> Strategy {
        let cache = Arc::new(TokenCache::new(Arc::new(exchange)));
        Strategy::new(parse_accounts(accounts), cache, recognizer)
    }

    const TWO_ACCOUNTS: &str = "AK_A,SK_A|AK_B,SK_B";

    #[tokio::test]
    async fn retryable_codes_advance_until_success() {
        let recognizer = Arc::new(ScriptedRecognizer::new(vec![
            error_body(18),
            error_body(18),
            ok_body(),
        ]));
        let strategy = strategy_with(TWO_ACCOUNTS, recognizer.clone(), TestExchange::ok());

        let success = strategy.run("aW1n", None).await.unwrap();

        // Two table attempts rate limited, third call (first accurate
        // attempt) wins. Exactly three provider calls.
        assert_eq!(recognizer.calls().len(), 3);
        assert!(success.strategy_used.starts_with("accurate_acc"));
        assert_eq!(success.result["words_result_num"], 1);
    }

    #[tokio::test]
    async fn non_retryable_code_aborts_immediately() {
        let recognizer = Arc::new(ScriptedRecognizer::new(vec![error_body(21)]));
        let strategy = strategy_with(TWO_ACCOUNTS, recognizer.clone(), TestExchange::ok());

        let failure = strategy.run("aW1n", None).await.unwrap_err();

        assert_eq!(recognizer.calls().len(), 1, "no further provider calls");
        match failure {
            DispatchFailure::NonRetryable { code, .. } => assert_eq!(code, 21),
            other => panic!("expected NonRetryable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn forced_basic_uses_only_second_account() {
        let recognizer = Arc::new(ScriptedRecognizer::new(vec![ok_body()]));
        let strategy = strategy_with(TWO_ACCOUNTS, recognizer.clone(), TestExchange::ok());

        let success = strategy.run("aW1n", Some(Mode::Basic)).await.unwrap();

        let calls = recognizer.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (Mode::Basic, "tok_AK_B".into()));
        assert_eq!(success.strategy_used, "basic_acc1");
    }

    #[tokio::test]
    async fn forced_basic_without_second_account_makes_no_calls() {
        let recognizer = Arc::new(ScriptedRecognizer::new(vec![]));
        let strategy = strategy_with("AK_A,SK_A", recognizer.clone(), TestExchange::ok());

        let failure = strategy.run("aW1n", Some(Mode::Basic)).await.unwrap_err();

        assert!(recognizer.calls().is_empty());
        match failure {
            DispatchFailure::Exhausted { last } => assert!(last.is_none()),
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_accounts_is_a_configuration_failure() {
        let recognizer = Arc::new(ScriptedRecognizer::new(vec![]));
        let strategy = strategy_with("", recognizer.clone(), TestExchange::ok());

        let failure = strategy.run("aW1n", None).await.unwrap_err();

        assert!(recognizer.calls().is_empty());
        assert!(matches!(failure, DispatchFailure::NoAccounts));
        assert_eq!(failure.error_code(), -3);
    }

    #[tokio::test]
    async fn exhausted_chain_surfaces_last_retryable_error() {
        // Full chain with two accounts: table x2, accurate x2, basic x1.
        let recognizer = Arc::new(ScriptedRecognizer::new(vec![
            error_body(17),
            error_body(17),
            error_body(18),
            error_body(18),
            error_body(18),
        ]));
        let strategy = strategy_with(TWO_ACCOUNTS, recognizer.clone(), TestExchange::ok());

        let failure = strategy.run("aW1n", None).await.unwrap_err();

        assert_eq!(recognizer.calls().len(), 5);
        assert_eq!(failure.error_code(), 18);
        assert_eq!(failure.suggestion(), "service is busy, please retry shortly");
    }

    #[tokio::test]
    async fn token_failure_skips_pair_but_chain_continues() {
        // Account A can never authenticate; the provider is only reached
        // through account B.
        let recognizer = Arc::new(ScriptedRecognizer::new(vec![ok_body()]));
        let strategy = strategy_with(
            TWO_ACCOUNTS,
            recognizer.clone(),
            TestExchange::failing_for("AK_A"),
        );

        let success = strategy.run("aW1n", Some(Mode::Table)).await.unwrap();

        let calls = recognizer.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "tok_AK_B");
        assert_eq!(success.strategy_used, "table_acc1");
    }

    #[tokio::test]
    async fn transport_failure_is_a_failed_attempt_not_an_abort() {
        let recognizer = Arc::new(ScriptedRecognizer::new(vec![
            Err(ProviderError::Http("connection reset".into())),
            ok_body(),
        ]));
        let strategy = strategy_with(TWO_ACCOUNTS, recognizer.clone(), TestExchange::ok());

        let success = strategy.run("aW1n", Some(Mode::Accurate)).await.unwrap();

        assert_eq!(recognizer.calls().len(), 2);
        assert!(success.strategy_used.starts_with("accurate_acc"));
    }

    #[tokio::test]
    async fn exhausted_with_only_failed_attempts_suggests_generic_retry() {
        let strategy = strategy_with(
            TWO_ACCOUNTS,
            Arc::new(ScriptedRecognizer::new(vec![])),
            TestExchange {
                fail_keys: vec!["AK_A".into(), "AK_B".into()],
            },
        );

        let failure = strategy.run("aW1n", None).await.unwrap_err();

        assert_eq!(failure.error_code(), -1);
        assert_eq!(failure.suggestion(), "recognition failed, please retry");
    }

    #[test]
    fn plan_shuffles_all_accounts_for_table_and_accurate() {
        let strategy = strategy_with(
            "A,a|B,b|C,c",
            Arc::new(ScriptedRecognizer::new(vec![])),
            TestExchange::ok(),
        );

        let plan = strategy.plan(Some(Mode::Table));
        assert_eq!(plan.len(), 3);
        let mut indices: Vec<usize> = plan.iter().map(|(_, i)| *i).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(plan.iter().all(|(mode, _)| *mode == Mode::Table));
    }

    #[test]
    fn full_plan_ends_with_basic_on_account_one() {
        let strategy = strategy_with(
            TWO_ACCOUNTS,
            Arc::new(ScriptedRecognizer::new(vec![])),
            TestExchange::ok(),
        );

        let plan = strategy.plan(None);
        assert_eq!(plan.len(), 5, "table x2 + accurate x2 + basic x1");
        assert_eq!(plan[4], (Mode::Basic, 1));
        assert_eq!(
            plan.iter().filter(|(m, _)| *m == Mode::Table).count(),
            2
        );
        assert_eq!(
            plan.iter().filter(|(m, _)| *m == Mode::Accurate).count(),
            2
        );
    }

    #[test]
    fn plan_omits_basic_with_a_single_account() {
        let strategy = strategy_with(
            "AK_A,SK_A",
            Arc::new(ScriptedRecognizer::new(vec![])),
            TestExchange::ok(),
        );

        let plan = strategy.plan(None);
        assert_eq!(plan.len(), 2, "table x1 + accurate x1, basic skipped");
        assert!(plan.iter().all(|(m, _)| *m != Mode::Basic));
    }
}
