//! One scratch-card session
//!
//! [`Session`] owns the current code/reward pair, the scratch surface and the
//! effects, and moves through [`Phase`]s as the user scratches and claims.
//! Pointer handlers and [`Session::frame`] are the only entry points that
//! advance it; both run on the UI thread.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::audio::{SoundBoard, SoundEffect};
use crate::claims::{
    ClaimError, ClaimForm, ClaimRequest, ClaimService, ServiceError, ValidationError,
};
use crate::effects::{ConfettiBurst, IntroAnimation};
use crate::notice::ConfirmationNotice;
use crate::render::Canvas2d;
use crate::reward::{CouponCode, Draw, RewardDistributor, RewardResult};
use crate::scratch::{ScratchEvent, ScratchSurface};
use crate::settings::SessionConfig;
use crate::tasks::{Scheduled, TaskStatus};

/// Where the card is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Dealt, untouched
    Idle,
    Scratching,
    /// Reward visible; terminal for BetterLuck
    Revealed,
    Claimed,
}

/// Claim form status while `Revealed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimStatus {
    Editing,
    InFlight,
    /// Last submission failed with this message
    Failed(String),
}

/// Things the shell should react to after a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    IntroFinished,
    Revealed(RewardResult),
    ConfettiFinished,
    NoticeClosed,
}

pub struct Session {
    config: SessionConfig,
    distributor: RewardDistributor,
    rng: Pcg32,
    card_size: (u32, u32),
    viewport: Vec2,
    draw: Draw,
    phase: Phase,
    claim: ClaimStatus,
    /// Last form problem found on submit, shown next to its field
    form_error: Option<ValidationError>,
    surface: ScratchSurface,
    intro: Option<Scheduled<IntroAnimation>>,
    confetti: Option<Scheduled<ConfettiBurst>>,
    notice: Option<ConfirmationNotice>,
}

impl Session {
    /// Deal the first card; `card_size` is the overlay's pixel resolution
    pub fn new(config: SessionConfig, seed: u64, card_size: (u32, u32), viewport: Vec2) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut distributor = RewardDistributor::new(config.table.clone());
        if let Some(prefix) = &config.code_prefix {
            match distributor.clone().with_prefix(prefix.clone()) {
                Ok(custom) => distributor = custom,
                Err(e) => log::warn!("Using default coupon prefix: {e}"),
            }
        }

        let draw = distributor.draw(&mut rng);
        let surface = Self::fresh_surface(&config, card_size, &mut rng);
        let intro = config
            .intro
            .then(|| Scheduled::new(IntroAnimation::new(&mut rng, viewport)));
        log::debug!("Session started: {} ({})", draw.code, draw.reward);

        Self {
            config,
            distributor,
            rng,
            card_size,
            viewport,
            draw,
            phase: Phase::Idle,
            claim: ClaimStatus::Editing,
            form_error: None,
            surface,
            intro,
            confetti: None,
            notice: None,
        }
    }

    fn fresh_surface(
        config: &SessionConfig,
        (w, h): (u32, u32),
        rng: &mut Pcg32,
    ) -> ScratchSurface {
        ScratchSurface::new(w, h, config.reveal_threshold, rng.random())
    }

    /// Throw the card away and deal a new one
    pub fn new_card(&mut self) {
        self.draw = self.distributor.draw(&mut self.rng);
        self.surface.teardown();
        self.surface = Self::fresh_surface(&self.config, self.card_size, &mut self.rng);
        self.phase = Phase::Idle;
        self.claim = ClaimStatus::Editing;
        self.form_error = None;
        self.notice = None;
        // Cleared on the next frame
        if let Some(confetti) = &self.confetti {
            confetti.token().cancel();
        }
        log::debug!("New card: {} ({})", self.draw.code, self.draw.reward);
    }

    pub fn code(&self) -> &CouponCode {
        &self.draw.code
    }

    pub fn reward(&self) -> RewardResult {
        self.draw.reward
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn claim_status(&self) -> &ClaimStatus {
        &self.claim
    }

    pub fn surface(&self) -> &ScratchSurface {
        &self.surface
    }

    /// Problem that stopped the last submit, if the form was at fault
    pub fn form_error(&self) -> Option<&ValidationError> {
        self.form_error.as_ref()
    }

    pub fn notice(&self) -> Option<&ConfirmationNotice> {
        self.notice.as_ref()
    }

    pub fn is_intro_running(&self) -> bool {
        self.intro.as_ref().is_some_and(|t| t.is_running())
    }

    pub fn is_confetti_running(&self) -> bool {
        self.confetti.as_ref().is_some_and(|t| t.is_running())
    }

    /// Skip the intro; its canvas is cleared on the next frame
    pub fn skip_intro(&mut self) {
        if let Some(intro) = &self.intro {
            intro.token().cancel();
        }
    }

    /// Card element was resized on screen
    pub fn set_display_size(&mut self, width: f32, height: f32) {
        self.surface.set_display_size(width, height);
    }

    /// Effects canvas was resized; later bursts spawn across the new size
    pub fn set_viewport(&mut self, viewport: Vec2) {
        self.viewport = viewport;
    }

    // === Pointer input (ignored while the intro plays) ===

    pub fn pointer_down(&mut self, pos: Vec2) {
        if self.is_intro_running() {
            return;
        }
        if self.phase == Phase::Idle {
            self.phase = Phase::Scratching;
        }
        self.surface.pointer_down(pos);
    }

    pub fn pointer_move(&mut self, pos: Vec2, sfx: &mut dyn SoundBoard) {
        if self.is_intro_running() {
            return;
        }
        if let Some(ScratchEvent::ScratchSound) = self.surface.pointer_move(pos) {
            sfx.play(SoundEffect::Scratch);
        }
    }

    pub fn pointer_up(&mut self, sfx: &mut dyn SoundBoard) {
        if let Some(ScratchEvent::ScratchSound) = self.surface.pointer_up() {
            sfx.play(SoundEffect::Scratch);
        }
    }

    // === Frame loop ===

    /// Advance animations and the throttled progress scan
    pub fn frame<C: Canvas2d + ?Sized>(
        &mut self,
        now_ms: f64,
        effects: &mut C,
        sfx: &mut dyn SoundBoard,
    ) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        if let Some(intro) = &mut self.intro {
            if intro.run_frame(effects, now_ms) != TaskStatus::Running {
                self.intro = None;
                events.push(SessionEvent::IntroFinished);
            }
        }

        if let Some(ScratchEvent::Revealed { progress }) = self.surface.on_frame() {
            if let Some(event) = self.reveal(progress, sfx) {
                events.push(event);
            }
        }

        if let Some(confetti) = &mut self.confetti {
            match confetti.run_frame(effects, now_ms) {
                TaskStatus::Running => {}
                TaskStatus::Done => {
                    self.confetti = None;
                    events.push(SessionEvent::ConfettiFinished);
                }
                TaskStatus::Cancelled => self.confetti = None,
            }
        }

        if self.notice.as_ref().is_some_and(|n| n.is_closed(now_ms)) {
            self.notice = None;
            events.push(SessionEvent::NoticeClosed);
        }

        events
    }

    /// Scratching -> Revealed, with the win effects
    fn reveal(&mut self, progress: f32, sfx: &mut dyn SoundBoard) -> Option<SessionEvent> {
        if !matches!(self.phase, Phase::Idle | Phase::Scratching) {
            return None;
        }
        self.phase = Phase::Revealed;
        let reward = self.draw.reward;
        log::info!("Revealed {} at {:.0}% ({})", self.draw.code, progress * 100.0, reward);

        if reward.is_win() {
            if self.config.confetti {
                if let Some(old) = &self.confetti {
                    old.token().cancel();
                }
                let burst = ConfettiBurst::new(&mut self.rng, self.viewport);
                self.confetti = Some(Scheduled::new(burst));
            }
            sfx.play(SoundEffect::WinningChime);
        }
        Some(SessionEvent::Revealed(reward))
    }

    // === Claims ===

    /// Whether the submit button should be enabled for `form`
    pub fn can_submit(&self, form: &ClaimForm) -> bool {
        self.phase == Phase::Revealed
            && self.draw.reward.is_win()
            && self.claim != ClaimStatus::InFlight
            && form.is_valid()
    }

    pub fn submit_label(&self) -> &'static str {
        match self.claim {
            ClaimStatus::Editing => "Claim Reward",
            ClaimStatus::InFlight => "Submitting...",
            ClaimStatus::Failed(_) => "Retry",
        }
    }

    /// Validate and mark the claim in flight; send the request, then call
    /// [`Session::finish_claim`] with the outcome
    pub fn begin_claim(
        &mut self,
        form: &ClaimForm,
        now_ms: f64,
    ) -> Result<ClaimRequest, ClaimError> {
        match self.phase {
            Phase::Idle | Phase::Scratching => return Err(ClaimError::NotRevealed),
            Phase::Claimed => return Err(ClaimError::AlreadyClaimed),
            Phase::Revealed => {}
        }
        let Some(amount) = self.draw.reward.amount() else {
            return Err(ClaimError::NotEligible);
        };
        if self.claim == ClaimStatus::InFlight {
            return Err(ClaimError::InFlight);
        }

        let details = form
            .validate()
            .inspect_err(|e| self.form_error = Some(e.clone()))?;
        self.form_error = None;
        self.claim = ClaimStatus::InFlight;
        Ok(ClaimRequest::new(self.draw.code.clone(), amount, details, now_ms))
    }

    /// Apply the service's answer for `code`
    ///
    /// Answers for a card that is no longer in flight are ignored.
    pub fn finish_claim(
        &mut self,
        code: &CouponCode,
        result: Result<(), ServiceError>,
        now_ms: f64,
    ) -> Result<(), ClaimError> {
        if code != &self.draw.code || self.claim != ClaimStatus::InFlight {
            log::debug!("Ignoring stale claim response for {code}");
            return Ok(());
        }

        match result {
            Ok(()) => {
                log::info!("Claim submitted for {code}");
                let amount = self.draw.reward.amount().unwrap_or_default();
                self.phase = Phase::Claimed;
                self.claim = ClaimStatus::Editing;
                self.notice = Some(ConfirmationNotice::new(
                    amount,
                    now_ms,
                    self.config.notice_duration_ms,
                ));
                Ok(())
            }
            Err(e) => {
                log::warn!("Claim for {code} failed: {e}");
                self.claim = ClaimStatus::Failed(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Submit through a synchronous service in one step
    pub fn submit_claim(
        &mut self,
        service: &mut dyn ClaimService,
        form: &ClaimForm,
        now_ms: f64,
    ) -> Result<(), ClaimError> {
        let request = self.begin_claim(form, now_ms)?;
        let code = request.code.clone();
        let result = service.submit_claim(request);
        self.finish_claim(&code, result, now_ms)
    }

    /// Close button on the confirmation
    pub fn dismiss_notice(&mut self, now_ms: f64) {
        if let Some(notice) = &mut self.notice {
            notice.dismiss(now_ms);
        }
    }

    /// Stop every animation and pending scan; the view is going away
    pub fn teardown<C: Canvas2d + ?Sized>(&mut self, effects: &mut C) {
        if let Some(mut intro) = self.intro.take() {
            intro.cancel(effects);
        }
        if let Some(mut confetti) = self.confetti.take() {
            confetti.cancel(effects);
        }
        self.surface.teardown();
        effects.clear();
    }
}
