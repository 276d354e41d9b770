//! Badge aggregation engine
//!
//! Classifies inbound records and drives the badge-definition dependency
//! resolver: awards and showcase listings reference definitions that may
//! not have arrived yet, and may arrive from a different relay than the
//! one that produced the reference. The engine tracks which definitions
//! are known, which are pending, and fetches the missing ones on demand
//! with at most one outbound query per key per session.
//!
//! One engine instance owns all session state and must be driven from a
//! single task; the pool's inbound channel is the only entry point for
//! relay data, which serializes every mutation without locks.

mod badge;
mod state;

pub use badge::{BadgeDefinition, BadgeKey};
pub use state::ResolutionState;

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::identity;
use crate::pool::{Incoming, Transport};
use crate::protocol::{
    ClientMessage, Event, Filter, ProfileMetadata, KIND_BADGE_AWARD, KIND_BADGE_DEFINITION,
    KIND_PROFILE, KIND_PROFILE_BADGES,
};
use crate::render::{BadgeCategory, ProfileView, Render};
use crate::subscription::SubscriptionRegistry;
use crate::types::{EmblemError, Result};

/// Default result-count bound for award and definition queries
pub const DEFAULT_REQUEST_LIMIT: u32 = 100;

/// State for one loaded subject. Replaced wholesale by `load_subject`;
/// nothing survives into the next session.
struct Session {
    /// Subject pubkey (hex)
    subject: String,
    /// The subject's npub, kept for display
    npub: String,
    state: ResolutionState,
    /// One-shot profile latch
    profile_shown: bool,
}

/// The aggregation engine: event classifier, resolution state machine,
/// and session controller.
pub struct BadgeEngine<T: Transport, R: Render> {
    transport: T,
    registry: SubscriptionRegistry,
    render: R,
    request_limit: u32,
    session: Option<Session>,
}

impl<T: Transport, R: Render> BadgeEngine<T, R> {
    pub fn new(transport: T, render: R) -> Self {
        Self {
            transport,
            registry: SubscriptionRegistry::new(),
            render,
            request_limit: DEFAULT_REQUEST_LIMIT,
            session: None,
        }
    }

    /// Override the result-count bound for award and definition queries.
    pub fn with_request_limit(mut self, request_limit: u32) -> Self {
        self.request_limit = request_limit;
        self
    }

    /// Load all data for one subject: cancel the previous session's
    /// subscriptions, reset resolution state, clear the display, then
    /// issue the four canonical queries. The clear happens on this task
    /// before any query goes out, so no post-reset record can render
    /// into a stale view.
    pub async fn load_subject(&mut self, subject: &str) -> Result<()> {
        let npub = identity::encode_npub(subject)?;

        self.registry.close_all(&self.transport).await;
        self.session = Some(Session {
            subject: subject.to_string(),
            npub: npub.clone(),
            state: ResolutionState::default(),
            profile_shown: false,
        });

        self.render.clear_all();
        let short: String = npub.chars().take(16).collect();
        self.render.set_status(&format!("{short}... loading"));
        info!("Loading subject {}", npub);

        let queries = [
            Filter::new([KIND_PROFILE]).authors([subject]).limit(1),
            Filter::new([KIND_BADGE_AWARD])
                .tag('p', [subject])
                .limit(self.request_limit),
            Filter::new([KIND_BADGE_DEFINITION])
                .authors([subject])
                .limit(self.request_limit),
            Filter::new([KIND_PROFILE_BADGES]).authors([subject]).limit(1),
        ];
        for filter in queries {
            let sub_id = self.registry.open(&filter);
            self.transport
                .broadcast(&ClientMessage::Req { sub_id, filter })
                .await;
        }

        Ok(())
    }

    /// Process one item from the pool's inbound stream. This is the
    /// single logical critical section: connectivity updates, record
    /// classification, and every session mutation pass through here.
    pub async fn handle(&mut self, incoming: Incoming) {
        match incoming {
            Incoming::Connectivity { connected, total } => {
                self.render
                    .set_status(&format!("connected ({connected}/{total})"));
            }
            Incoming::Event {
                relay,
                sub_id,
                event,
            } => {
                if !self.registry.is_active(&sub_id) {
                    debug!(
                        "Dropping record from {} on closed subscription {}",
                        relay, sub_id
                    );
                    return;
                }
                if let Err(e) = self.classify(event).await {
                    warn!("Dropped record from {}: {}", relay, e);
                }
            }
        }
    }

    /// Drive the engine from the inbound stream until it closes.
    pub async fn run(&mut self, mut rx: mpsc::UnboundedReceiver<Incoming>) {
        while let Some(incoming) = rx.recv().await {
            self.handle(incoming).await;
        }
    }

    /// Route one record by kind. Unrecognized kinds drop silently so
    /// unknown record types never block the stream.
    async fn classify(&mut self, event: Event) -> Result<()> {
        match event.kind {
            KIND_PROFILE => self.on_profile(event),
            KIND_BADGE_AWARD => self.on_award(event).await,
            KIND_BADGE_DEFINITION => self.on_definition(event),
            KIND_PROFILE_BADGES => self.on_listing(event).await,
            kind => {
                trace!("Ignoring record of unrecognized kind {}", kind);
                Ok(())
            }
        }
    }

    /// Profile record: one-shot latch, first record whose author is the
    /// loaded subject wins. Malformed content is dropped without
    /// engaging the latch.
    fn on_profile(&mut self, event: Event) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if event.pubkey != session.subject || session.profile_shown {
            return Ok(());
        }

        let content: &str = if event.content.is_empty() {
            "{}"
        } else {
            event.content.as_str()
        };
        let meta: ProfileMetadata = serde_json::from_str(content)
            .map_err(|e| EmblemError::MalformedRecord(format!("Unparseable profile content: {e}")))?;

        session.profile_shown = true;
        let display_name = meta
            .display_name
            .or(meta.name)
            .unwrap_or_else(|| event.pubkey.chars().take(8).collect());
        let view = ProfileView {
            display_name,
            image_url: meta.picture.unwrap_or_default(),
            identity: session.npub.clone(),
            bio: meta.about.unwrap_or_default(),
        };
        self.render.show_profile(&view);
        Ok(())
    }

    /// Award record: extract the referenced key, record it, and either
    /// notify immediately (definition already known) or dedup-fetch.
    async fn on_award(&mut self, event: Event) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if !event.has_tag_value("p", &session.subject) {
            // Not for this session's subject
            return Ok(());
        }

        let aref = event
            .tag_value("a")
            .ok_or_else(|| EmblemError::MalformedRecord("Award without reference tag".to_string()))?;
        let key = BadgeKey::parse_ref(aref).ok_or_else(|| {
            EmblemError::MalformedRecord(format!("Award with malformed reference '{aref}'"))
        })?;

        session.state.mark_received(key.clone());
        if let Some(definition) = session.state.definition(&key) {
            let definition = definition.clone();
            self.render
                .show_badge(&key, &definition, BadgeCategory::Received);
        } else {
            self.request_definition(key).await;
        }
        Ok(())
    }

    /// Definition record: first writer wins per key, then fire the
    /// three independent notifications (issued, received, listed).
    fn on_definition(&mut self, event: Event) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let key = BadgeKey::from_definition(&event).ok_or_else(|| {
            EmblemError::MalformedRecord(format!(
                "Definition without identifier tag from {}",
                event.pubkey
            ))
        })?;

        let definition = BadgeDefinition::from_event(&event);
        if !session.state.resolve(key.clone(), definition.clone()) {
            debug!("Duplicate definition for {}", key);
            return Ok(());
        }

        let issued = event.pubkey == session.subject;
        let received = session.state.is_received(&key);
        let showcase = session
            .state
            .is_listed(&key)
            .then(|| session.state.showcase());

        if issued {
            self.render
                .show_badge(&key, &definition, BadgeCategory::Issued);
        }
        if received {
            self.render
                .show_badge(&key, &definition, BadgeCategory::Received);
        }
        if let Some(entries) = showcase {
            self.render.refresh_showcase(&entries);
        }
        Ok(())
    }

    /// Listing record: collect newly-seen keys in tag order, dedup-fetch
    /// each, then redraw the full showcase.
    async fn on_listing(&mut self, event: Event) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if event.pubkey != session.subject {
            return Ok(());
        }

        let ref_prefix = format!("{KIND_BADGE_DEFINITION}:");
        let mut fresh = Vec::new();
        for value in event.tag_values("a") {
            match BadgeKey::parse_ref(value) {
                Some(key) => {
                    if session.state.mark_listed(key.clone()) {
                        fresh.push(key);
                    }
                }
                None => {
                    if value.starts_with(&ref_prefix) {
                        debug!("Skipping malformed listing reference '{}'", value);
                    }
                    // References to other kinds are simply not ours
                }
            }
        }

        for key in fresh {
            self.request_definition(key).await;
        }

        if let Some(session) = self.session.as_ref() {
            self.render.refresh_showcase(&session.state.showcase());
        }
        Ok(())
    }

    /// The dedup-fetch rule: at most one outbound definition query per
    /// (issuer, identifier) pair per session, no matter how many awards
    /// or listing entries reference it.
    async fn request_definition(&mut self, key: BadgeKey) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.state.is_known(&key) || !session.state.mark_pending(key.clone()) {
            return;
        }

        debug!("Requesting definition for {}", key);
        let filter = Filter::new([KIND_BADGE_DEFINITION])
            .authors([key.issuer.as_str()])
            .tag('d', [key.identifier.as_str()])
            .limit(1);
        let sub_id = self.registry.open(&filter);
        self.transport
            .broadcast(&ClientMessage::Req { sub_id, filter })
            .await;
    }

    pub fn resolved_count(&self) -> usize {
        self.session
            .as_ref()
            .map(|s| s.state.resolved_count())
            .unwrap_or(0)
    }

    pub fn pending_count(&self) -> usize {
        self.session
            .as_ref()
            .map(|s| s.state.pending_count())
            .unwrap_or(0)
    }

    pub fn received_count(&self) -> usize {
        self.session
            .as_ref()
            .map(|s| s.state.received_count())
            .unwrap_or(0)
    }

    pub fn listed_count(&self) -> usize {
        self.session
            .as_ref()
            .map(|s| s.state.listed_count())
            .unwrap_or(0)
    }
}
