//! Scratch Reveal entry point
//!
//! Handles platform-specific initialization and runs the frame loop.
//!
//! The page provides `scratch-canvas` (the card overlay), `effects-canvas`
//! (full-window confetti and intro), the claim form fields and the notice.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::Clamped;
    use wasm_bindgen::prelude::*;
    use web_sys::{
        CanvasRenderingContext2d, Document, HtmlButtonElement, HtmlCanvasElement,
        HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement, ImageData, MouseEvent,
        PageTransitionEvent, TouchEvent,
    };

    use scratch_reveal::audio::{AudioSynth, DefaultOutput};
    use scratch_reveal::claims::{ClaimField, ClaimForm, LocalClaimStore, REGIONS};
    use scratch_reveal::consts::*;
    use scratch_reveal::notice::NoticeStage;
    use scratch_reveal::render::WebCanvas;
    use scratch_reveal::session::ClaimStatus;
    use scratch_reveal::{
        Phase, RewardResult, Session, SessionConfig, SessionEvent, Settings, local_point,
    };

    /// Application state
    struct App {
        session: Session,
        audio: AudioSynth<DefaultOutput>,
        claims: LocalClaimStore,
        document: Document,
        card: HtmlCanvasElement,
        card_ctx: CanvasRenderingContext2d,
        effects_canvas: HtmlCanvasElement,
        effects: WebCanvas,
        /// Overlay pixels changed since the last blit
        card_dirty: bool,
        raf_handle: Option<i32>,
        torn_down: bool,
        /// Time of the latest animation frame
        now: f64,
    }

    impl App {
        /// Copy the overlay pixmap onto the card canvas
        fn blit_card(&mut self) {
            let pixmap = self.session.surface().pixmap();
            match ImageData::new_with_u8_clamped_array_and_sh(
                Clamped(pixmap.data()),
                pixmap.width(),
                pixmap.height(),
            ) {
                Ok(image) => {
                    let _ = self.card_ctx.put_image_data(&image, 0.0, 0.0);
                }
                Err(e) => log::warn!("Overlay blit failed: {:?}", e),
            }
            self.card_dirty = false;
        }

        /// Pointer position in card display coordinates
        fn card_point(&mut self, client_x: i32, client_y: i32) -> Vec2 {
            let rect = self.card.get_bounding_client_rect();
            self.session
                .set_display_size(rect.width() as f32, rect.height() as f32);
            local_point(
                Vec2::new(client_x as f32, client_y as f32),
                Vec2::new(rect.left() as f32, rect.top() as f32),
            )
        }

        fn read_form(&self) -> ClaimForm {
            let value_of_input = |id: &str| {
                element::<HtmlInputElement>(&self.document, id)
                    .map(|el| el.value())
                    .unwrap_or_default()
            };
            ClaimForm {
                region: element::<HtmlSelectElement>(&self.document, "claim-region")
                    .map(|el| el.value())
                    .unwrap_or_default(),
                locality: value_of_input("claim-city"),
                payout_id: value_of_input("claim-upi"),
                feedback: element::<HtmlTextAreaElement>(&self.document, "claim-feedback")
                    .map(|el| el.value())
                    .unwrap_or_default(),
            }
        }

        /// Update card, claim form and notice elements in DOM
        fn update_dom(&self) {
            let doc = &self.document;
            let session = &self.session;

            let reward_text = match session.reward() {
                RewardResult::Reward { amount } => format!("₹{amount}"),
                RewardResult::BetterLuck => "Better luck next time!".to_string(),
            };
            set_text(doc, "reward-text", &reward_text);
            set_text(doc, "coupon-code", session.code().as_str());

            let claimable = session.phase() == Phase::Revealed && session.reward().is_win();
            set_class(doc, "claim-section", if claimable { "claim" } else { "claim hidden" });
            set_class(
                doc,
                "claim-success",
                if session.phase() == Phase::Claimed { "success" } else { "success hidden" },
            );

            if let Some(btn) = element::<HtmlButtonElement>(doc, "claim-submit") {
                btn.set_disabled(!session.can_submit(&self.read_form()));
                btn.set_text_content(Some(session.submit_label()));
            }

            match session.claim_status() {
                ClaimStatus::Failed(msg) => {
                    set_text(doc, "claim-error", msg);
                    set_class(doc, "claim-error", "error");
                }
                _ => set_class(doc, "claim-error", "error hidden"),
            }

            for field in [ClaimField::Region, ClaimField::Locality, ClaimField::PayoutId] {
                let id = field_error_id(field);
                match session.form_error().filter(|e| e.field() == field) {
                    Some(e) => {
                        set_text(doc, id, &e.to_string());
                        set_class(doc, id, "field-error");
                    }
                    None => set_class(doc, id, "field-error hidden"),
                }
            }

            match session.notice() {
                Some(notice) => {
                    let mut class = match notice.stage(self.now) {
                        NoticeStage::Shown => "notice visible".to_string(),
                        NoticeStage::Closed => "notice hidden".to_string(),
                        _ => "notice".to_string(),
                    };
                    if notice.has_ripple(self.now) {
                        class.push_str(" ripple");
                    }
                    set_text(doc, "notice-message", &notice.message());
                    set_class(doc, "notice", &class);
                }
                None => set_class(doc, "notice", "notice hidden"),
            }
        }

        /// Stop the frame loop and every animation
        fn teardown(&mut self) {
            if self.torn_down {
                return;
            }
            self.torn_down = true;
            if let (Some(handle), Some(window)) = (self.raf_handle.take(), web_sys::window()) {
                let _ = window.cancel_animation_frame(handle);
            }
            self.session.teardown(&mut self.effects);
            log::info!("Torn down");
        }

        /// Page came back from the back/forward cache
        fn resume(app: &Rc<RefCell<App>>) {
            {
                let mut g = app.borrow_mut();
                if !g.torn_down {
                    return;
                }
                g.torn_down = false;
                g.card_dirty = true;
            }
            log::info!("Resumed");
            request_animation_frame(app.clone());
        }

        /// Match the effects canvas to the window
        fn fit_effects(&mut self) {
            let Some(window) = web_sys::window() else {
                return;
            };
            let (width, height) = window_size(&window);
            self.effects_canvas.set_width(width as u32);
            self.effects_canvas.set_height(height as u32);
            self.session.set_viewport(Vec2::new(width as f32, height as f32));
        }
    }

    /// Element that shows the inline message for `field`
    fn field_error_id(field: ClaimField) -> &'static str {
        match field {
            ClaimField::Region => "claim-region-error",
            ClaimField::Locality => "claim-city-error",
            ClaimField::PayoutId => "claim-upi-error",
        }
    }

    fn window_size(window: &web_sys::Window) -> (f64, f64) {
        let width = window
            .inner_width()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(800.0);
        let height = window
            .inner_height()
            .ok()
            .and_then(|v| v.as_f64())
            .unwrap_or(600.0);
        (width, height)
    }

    fn element<T: JsCast>(doc: &Document, id: &str) -> Option<T> {
        doc.get_element_by_id(id)?.dyn_into::<T>().ok()
    }

    fn set_text(doc: &Document, id: &str, text: &str) {
        if let Some(el) = doc.get_element_by_id(id) {
            el.set_text_content(Some(text));
        }
    }

    fn set_class(doc: &Document, id: &str, class: &str) {
        if let Some(el) = doc.get_element_by_id(id) {
            let _ = el.set_attribute("class", class);
        }
    }

    fn canvas_2d(doc: &Document, id: &str) -> (HtmlCanvasElement, CanvasRenderingContext2d) {
        let canvas: HtmlCanvasElement = doc
            .get_element_by_id(id)
            .expect("no canvas")
            .dyn_into()
            .expect("not a canvas");
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .expect("no 2d context")
            .expect("no 2d context")
            .dyn_into()
            .expect("not a 2d context");
        (canvas, ctx)
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Scratch Reveal starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        let (card, card_ctx) = canvas_2d(&document, "scratch-canvas");
        card.set_width(CARD_WIDTH);
        card.set_height(CARD_HEIGHT);

        let (effects_canvas, effects_ctx) = canvas_2d(&document, "effects-canvas");
        let (width, height) = window_size(&window);
        effects_canvas.set_width(width as u32);
        effects_canvas.set_height(height as u32);

        let settings = Settings::load();
        let mut audio = AudioSynth::new();
        audio.configure(&settings);

        let seed = js_sys::Date::now() as u64;
        let session = Session::new(
            SessionConfig::from(&settings),
            seed,
            (CARD_WIDTH, CARD_HEIGHT),
            Vec2::new(width as f32, height as f32),
        );

        populate_regions(&document);

        let app = Rc::new(RefCell::new(App {
            session,
            audio,
            claims: LocalClaimStore::load(),
            document,
            card: card.clone(),
            card_ctx,
            effects_canvas: effects_canvas.clone(),
            effects: WebCanvas::new(effects_canvas, effects_ctx),
            card_dirty: true,
            raf_handle: None,
            torn_down: false,
            now: 0.0,
        }));

        setup_input_handlers(&card, app.clone());
        setup_buttons(app.clone());
        setup_teardown(app.clone());

        request_animation_frame(app);
    }

    fn populate_regions(doc: &Document) {
        let Some(select) = doc.get_element_by_id("claim-region") else {
            return;
        };
        for region in REGIONS {
            if let Ok(option) = doc.create_element("option") {
                let _ = option.set_attribute("value", region);
                option.set_text_content(Some(region));
                let _ = select.append_child(&option);
            }
        }
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        // Mouse down
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut g = app.borrow_mut();
                let pos = g.card_point(event.client_x(), event.client_y());
                g.session.pointer_down(pos);
                g.card_dirty = true;
            });
            let _ = canvas
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Mouse move
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut g = app.borrow_mut();
                let pos = g.card_point(event.client_x(), event.client_y());
                let g = &mut *g;
                g.session.pointer_move(pos, &mut g.audio);
                g.card_dirty = true;
            });
            let _ = canvas
                .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch start
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                if let Some(touch) = event.touches().get(0) {
                    let mut g = app.borrow_mut();
                    let pos = g.card_point(touch.client_x(), touch.client_y());
                    g.session.pointer_down(pos);
                    g.card_dirty = true;
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch move
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                if let Some(touch) = event.touches().get(0) {
                    let mut g = app.borrow_mut();
                    let pos = g.card_point(touch.client_x(), touch.client_y());
                    let g = &mut *g;
                    g.session.pointer_move(pos, &mut g.audio);
                    g.card_dirty = true;
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("touchmove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Release anywhere ends the gesture
        for name in ["mouseup", "touchend", "touchcancel"] {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let mut g = app.borrow_mut();
                let g = &mut *g;
                g.session.pointer_up(&mut g.audio);
            });
            let _ = window.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_buttons(app: Rc<RefCell<App>>) {
        let document = app.borrow().document.clone();

        if let Some(btn) = document.get_element_by_id("claim-submit") {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::Event| {
                event.prevent_default();
                let mut g = app.borrow_mut();
                let form = g.read_form();
                let now = g.now;
                let App {
                    session, claims, ..
                } = &mut *g;
                if let Err(e) = session.submit_claim(claims, &form, now) {
                    log::info!("Claim not submitted: {e}");
                }
                g.update_dom();
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("new-card-btn") {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                let mut g = app.borrow_mut();
                g.session.new_card();
                g.card_dirty = true;
                g.update_dom();
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("notice-close") {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                let mut g = app.borrow_mut();
                let now = g.now;
                g.session.dismiss_notice(now);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        if let Some(btn) = document.get_element_by_id("intro-skip") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
                app.borrow_mut().session.skip_intro();
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Stop everything when the page goes away, restart if it comes back
    fn setup_teardown(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: PageTransitionEvent| {
                app.borrow_mut().teardown();
            });
            let _ = window
                .add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PageTransitionEvent| {
                if event.persisted() {
                    App::resume(&app);
                }
            });
            let _ = window
                .add_event_listener_with_callback("pageshow", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            app.borrow_mut().fit_effects();
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let next = app.clone();
        let closure = Closure::once(move |time: f64| {
            frame_loop(next, time);
        });
        match window.request_animation_frame(closure.as_ref().unchecked_ref()) {
            Ok(handle) => app.borrow_mut().raf_handle = Some(handle),
            Err(e) => log::warn!("requestAnimationFrame failed: {:?}", e),
        }
        closure.forget();
    }

    fn frame_loop(app: Rc<RefCell<App>>, time: f64) {
        {
            let mut g = app.borrow_mut();
            if g.torn_down {
                return;
            }
            g.now = time;

            let g = &mut *g;
            let events = g.session.frame(time, &mut g.effects, &mut g.audio);
            for event in events {
                if let SessionEvent::Revealed(reward) = event {
                    log::info!("Card revealed: {reward}");
                }
            }

            if g.card_dirty {
                g.blit_card();
            }
            g.update_dom();
        }

        request_animation_frame(app);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_app::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Scratch Reveal (native) starting...");
    log::info!("The interactive card needs a browser - run with `trunk serve` for the web version");

    println!("\nScratching a demo card...");
    run_demo();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Scratch one card headlessly and claim it if it wins
#[cfg(not(target_arch = "wasm32"))]
fn run_demo() {
    use glam::Vec2;
    use scratch_reveal::audio::{AudioSynth, DefaultOutput};
    use scratch_reveal::consts::*;
    use scratch_reveal::render::RecordingCanvas;
    use scratch_reveal::{ClaimForm, LocalClaimStore, Phase, Session, SessionConfig, Settings};

    let settings = Settings::load();
    let mut audio = AudioSynth::<DefaultOutput>::new();
    audio.configure(&settings);

    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let config = SessionConfig {
        intro: false,
        ..SessionConfig::from(&settings)
    };
    let viewport = Vec2::new(800.0, 600.0);
    let mut session = Session::new(config, seed, (CARD_WIDTH, CARD_HEIGHT), viewport);
    let mut effects = RecordingCanvas::new(viewport.x, viewport.y);
    println!("Card {}", session.code());

    // Drag row by row until the reward shows
    let mut now = 0.0;
    let mut y = 0.0;
    session.pointer_down(Vec2::new(0.0, y));
    while session.phase() != Phase::Revealed && y <= CARD_HEIGHT as f32 {
        let mut x = 0.0;
        while x <= CARD_WIDTH as f32 {
            session.pointer_move(Vec2::new(x, y), &mut audio);
            x += 20.0;
        }
        now += FRAME_MS;
        session.frame(now, &mut effects, &mut audio);
        y += 20.0;
    }
    session.pointer_up(&mut audio);

    let reward = session.reward();
    println!(
        "Revealed at {:.0}%: {}",
        session.surface().progress() * 100.0,
        reward
    );

    if reward.is_win() {
        let form = ClaimForm {
            region: "Karnataka".into(),
            locality: "Bengaluru".into(),
            payout_id: "demo@upi".into(),
            feedback: "native demo".into(),
        };
        let mut store = LocalClaimStore::new();
        match session.submit_claim(&mut store, &form, now) {
            Ok(()) => println!(
                "✓ {}",
                session.notice().map(|n| n.message()).unwrap_or_default()
            ),
            Err(e) => println!("✗ Claim failed: {e}"),
        }
    }

    session.teardown(&mut effects);
}
