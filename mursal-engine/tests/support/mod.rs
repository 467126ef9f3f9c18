//! Test doubles and wiring for engine scenario tests

#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use mursal_common::{CanonicalPhone, OrderRow, Signal};
use mursal_engine::{
    AutomationEngine, ChatTransport, EngineConfig, EngineDeps, MessageJob, MessageJobHandler,
    RejectedOfferJob, RejectedOfferJobHandler, ReminderJob, ReminderJobHandler, SendOutcome,
    SheetSource, settings,
};
use mursal_guard::{DuplicateGuard, GuardConfig};
use mursal_queue::{BackendSelection, DelayedQueue, QueueConfig, Worker};
use mursal_resilience::{
    BreakerConfig, ErrorCode, OperationFamily, OutboundError, ResilienceExecutor, RetryPolicy,
};
use tokio::sync::broadcast;

/// Scriptable in-memory order book.
#[derive(Default)]
pub struct MockSheetSource {
    rows: parking_lot::Mutex<Vec<OrderRow>>,
    failing: AtomicBool,
}

impl MockSheetSource {
    pub fn set_rows(&self, rows: Vec<OrderRow>) {
        *self.rows.lock() = rows;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl SheetSource for MockSheetSource {
    async fn fetch_rows(&self) -> Result<Vec<OrderRow>, OutboundError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(OutboundError::transient(
                ErrorCode::ConnectionReset,
                "mock sheet outage",
            ));
        }
        Ok(self.rows.lock().clone())
    }
}

/// How the mock transport answers sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    Deliver,
    Ambiguous,
    FailTransient,
    FailPermanent,
}

/// Scriptable chat transport recording every delivered message.
pub struct MockTransport {
    connected: AtomicBool,
    mode: parking_lot::Mutex<SendMode>,
    pub sent: parking_lot::Mutex<Vec<(String, String)>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            connected: AtomicBool::new(true),
            mode: parking_lot::Mutex::new(SendMode::Deliver),
            sent: parking_lot::Mutex::new(Vec::new()),
        }
    }
}

impl MockTransport {
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_mode(&self, mode: SendMode) {
        *self.mode.lock() = mode;
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait::async_trait]
impl ChatTransport for MockTransport {
    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send(
        &self,
        phone: &CanonicalPhone,
        body: &str,
    ) -> Result<SendOutcome, OutboundError> {
        match *self.mode.lock() {
            SendMode::Deliver => {
                self.sent.lock().push((phone.to_string(), body.to_string()));
                Ok(SendOutcome::Delivered)
            }
            SendMode::Ambiguous => Ok(SendOutcome::Ambiguous),
            SendMode::FailTransient => Err(OutboundError::transient(
                ErrorCode::ConnectionReset,
                "mock send failure",
            )),
            SendMode::FailPermanent => {
                Err(OutboundError::Permanent("mock rejection".to_string()))
            }
        }
    }
}

/// A fully wired engine over in-process queues and mock collaborators.
pub struct Harness {
    pub engine: Arc<AutomationEngine>,
    pub sheet: Arc<MockSheetSource>,
    pub transport: Arc<MockTransport>,
    pub guard: Arc<DuplicateGuard>,
    pub messages: Arc<DelayedQueue<MessageJob>>,
    pub reminders: Arc<DelayedQueue<ReminderJob>>,
    pub offers: Arc<DelayedQueue<RejectedOfferJob>>,
    pub settings: mursal_engine::SharedSettings,
    pub shutdown: broadcast::Sender<Signal>,
    _dir: tempfile::TempDir,
}

impl Harness {
    /// Build the harness and spawn the engine loop plus all three
    /// workers, with timing shrunk for tests.
    pub async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();

        let guard = Arc::new(
            DuplicateGuard::open(&GuardConfig {
                file_path: dir
                    .path()
                    .join("sent-messages.json")
                    .to_string_lossy()
                    .into_owned(),
                redis_url: None,
            })
            .await
            .unwrap(),
        );

        let mut resilience = ResilienceExecutor::new(BreakerConfig::default());
        let fast = RetryPolicy {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 2,
            jitter_factor: 0.0,
            attempt_timeout_secs: None,
        };
        resilience.set_policy(OperationFamily::SheetRead, fast);
        resilience.set_policy(OperationFamily::MessageSend, fast);
        let resilience = Arc::new(resilience);

        let selection = BackendSelection::InProcess;
        let queue_config = QueueConfig {
            fallback_retry_delay_secs: 0,
            ..Default::default()
        };
        let messages = Arc::new(DelayedQueue::new("messages", &selection, &queue_config));
        let reminders = Arc::new(DelayedQueue::new("reminders", &selection, &queue_config));
        let offers = Arc::new(DelayedQueue::new("offers", &selection, &queue_config));

        let sheet = Arc::new(MockSheetSource::default());
        let transport = Arc::new(MockTransport::default());

        // Delays stay comfortably beyond test duration; tests that need a
        // delayed job to fire set the relevant delay to zero first.
        let settings = settings::shared(mursal_engine::AutomationSettings {
            company_name: "متجر الاختبار".to_string(),
            reminder_delay_hours: 1.0,
            rejected_offer_delay_hours: 1.0,
            ..Default::default()
        });

        let config = EngineConfig {
            auto_start: false,
            startup_delay_secs: 0,
            send_jitter_min_ms: 0,
            send_jitter_max_ms: 0,
            transport_down_defer_secs: 0,
            ..Default::default()
        };

        let engine = Arc::new(AutomationEngine::new(
            config.clone(),
            EngineDeps {
                sheet: Arc::clone(&sheet) as Arc<dyn SheetSource>,
                transport: Arc::clone(&transport) as Arc<dyn ChatTransport>,
                guard: Arc::clone(&guard),
                resilience: Arc::clone(&resilience),
                messages: Arc::clone(&messages),
                reminders: Arc::clone(&reminders),
                offers: Arc::clone(&offers),
                settings: Arc::clone(&settings),
            },
        ));

        let (shutdown, _) = broadcast::channel(16);

        let engine_task = Arc::clone(&engine);
        let engine_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let _ = engine_task.serve(engine_shutdown).await;
        });

        let poll = Duration::from_millis(20);

        let message_handler = Arc::new(MessageJobHandler::new(
            Arc::clone(&transport) as Arc<dyn ChatTransport>,
            Arc::clone(&guard),
            Arc::clone(&resilience),
            &config,
        ));
        tokio::spawn(
            Worker::new(Arc::clone(&messages), message_handler, poll).serve(shutdown.subscribe()),
        );

        let reminder_handler = Arc::new(ReminderJobHandler::new(
            Arc::clone(&sheet) as Arc<dyn SheetSource>,
            Arc::clone(&guard),
            Arc::clone(&resilience),
            Arc::clone(&messages),
            Arc::clone(&settings),
        ));
        tokio::spawn(
            Worker::new(Arc::clone(&reminders), reminder_handler, poll).serve(shutdown.subscribe()),
        );

        let offer_handler = Arc::new(RejectedOfferJobHandler::new(
            Arc::clone(&sheet) as Arc<dyn SheetSource>,
            Arc::clone(&guard),
            Arc::clone(&resilience),
            Arc::clone(&messages),
            Arc::clone(&settings),
        ));
        tokio::spawn(
            Worker::new(Arc::clone(&offers), offer_handler, poll).serve(shutdown.subscribe()),
        );

        Self {
            engine,
            sheet,
            transport,
            guard,
            messages,
            reminders,
            offers,
            settings,
            shutdown,
            _dir: dir,
        }
    }

    /// Give the spawned workers time to drain their queues.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(150)).await;
    }
}

/// A typical first-seen new order row.
pub fn new_order_row() -> OrderRow {
    OrderRow {
        row_index: 2,
        order_id: "A-0001-111111".to_string(),
        customer_name: "سارة".to_string(),
        primary_phone: "01234567890".to_string(),
        product_name: "حذاء رياضي".to_string(),
        total_price: "250".to_string(),
        governorate: "القاهرة".to_string(),
        status: String::new(),
        order_date: "2024-06-15".to_string(),
        ..Default::default()
    }
}
