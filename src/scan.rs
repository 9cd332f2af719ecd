//! Scanner UI component.
//!
//! Owns the video element and one scanning session at a time: the camera
//! stream, the decode interval and the focus re-application interval. The
//! parent drives it through the `is_active` prop and observes it through
//! callbacks.

use gloo::timers::callback::Interval;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, HtmlVideoElement, MediaStream, MediaStreamTrack, MouseEvent};
use yew::prelude::*;

use crate::decoder::{self, CameraFacing, DecodeOutcome};
use crate::error::CameraError;
use crate::focus::{self, ConstraintPlan, FocusController, FocusPoint, ManualFocus};
use crate::session::{PermissionState, ScanSession, ScannerState};

pub struct Scanner {
    video_ref: NodeRef,
    canvas_ref: NodeRef,
    stream: Option<MediaStream>,
    session: ScanSession,
    focus: FocusController,
    decode_interval: Option<Interval>,
    focus_interval: Option<Interval>,
    /// Bumped on every start and teardown; completions carrying a stale
    /// generation release their stream instead of attaching it.
    generation: u32,
    running: bool,
}

pub enum ScannerMessage {
    StreamReady(u32, MediaStream),
    StreamReacquired(u32, MediaStream),
    StartFailed(u32, CameraError),
    /// First playback progress; the decode loop starts here.
    VideoReady,
    FrameTick,
    FocusTick,
    Tapped(MouseEvent),
}

#[derive(Properties, PartialEq, Clone)]
pub struct ScannerProps {
    pub is_active: bool,
    #[prop_or_default]
    pub facing_mode: CameraFacing,
    #[prop_or(500)]
    pub refresh_milliseconds: u32,
    #[prop_or_default]
    pub on_scan_success: Callback<String>,
    #[prop_or_default]
    pub on_scan_error: Callback<String>,
    #[prop_or_default]
    pub on_permission_change: Callback<PermissionState>,
    #[prop_or_default]
    pub on_state_change: Callback<ScannerState>,
    #[prop_or_default]
    pub class: Classes,
}

impl Component for Scanner {
    type Message = ScannerMessage;
    type Properties = ScannerProps;

    fn create(_ctx: &Context<Self>) -> Self {
        Self {
            video_ref: NodeRef::default(),
            canvas_ref: NodeRef::default(),
            stream: None,
            session: ScanSession::new(),
            focus: FocusController::new(),
            decode_interval: None,
            focus_interval: None,
            generation: 0,
            running: false,
        }
    }

    fn rendered(&mut self, ctx: &Context<Self>, first_render: bool) {
        if first_render && ctx.props().is_active {
            self.begin(ctx);
        }
    }

    fn changed(&mut self, ctx: &Context<Self>) -> bool {
        if ctx.props().is_active && !self.running {
            self.begin(ctx);
        } else if !ctx.props().is_active && self.running {
            self.teardown(ctx);
        }
        true
    }

    fn destroy(&mut self, ctx: &Context<Self>) {
        self.teardown(ctx);
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            ScannerMessage::StreamReady(generation, stream) => {
                if generation != self.generation || !self.running {
                    // The session this stream belongs to is already gone.
                    decoder::stop_tracks(&stream);
                    return false;
                }
                let video = match self.video_ref.cast::<HtmlVideoElement>() {
                    Some(video) => video,
                    None => {
                        decoder::stop_tracks(&stream);
                        return false;
                    }
                };
                video.set_src_object(Some(&stream));
                self.stream = Some(stream);
                self.report_permission(ctx, PermissionState::Granted);
                if let Some(track) = self.video_track() {
                    self.focus.attach(&track);
                    if let Some(plan) = self.focus.tick(js_sys::Date::now()) {
                        spawn_apply(track, plan);
                    }
                    let link = ctx.link().clone();
                    self.focus_interval =
                        Some(Interval::new(focus::FOCUS_REAPPLY_INTERVAL_MS, move || {
                            link.send_message(ScannerMessage::FocusTick);
                        }));
                }
                true
            }
            ScannerMessage::StreamReacquired(generation, stream) => {
                if generation != self.generation || !self.running {
                    decoder::stop_tracks(&stream);
                    return false;
                }
                if let Some(old) = self.stream.take() {
                    decoder::stop_tracks(&old);
                }
                if let Some(video) = self.video_ref.cast::<HtmlVideoElement>() {
                    video.set_src_object(Some(&stream));
                }
                self.stream = Some(stream);
                if let Some(track) = self.video_track() {
                    self.focus.attach(&track);
                }
                false
            }
            ScannerMessage::StartFailed(generation, error) => {
                if generation != self.generation {
                    return false;
                }
                self.fail(ctx, error);
                true
            }
            ScannerMessage::VideoReady => {
                if !self.running || self.decode_interval.is_some() {
                    return false;
                }
                log::info!("video stream live, starting decode loop");
                let link = ctx.link().clone();
                self.decode_interval = Some(Interval::new(
                    ctx.props().refresh_milliseconds,
                    move || link.send_message(ScannerMessage::FrameTick),
                ));
                self.report_state(ctx, ScannerState::Active);
                true
            }
            ScannerMessage::FrameTick => {
                if !self.running {
                    return false;
                }
                let (Some(video), Some(canvas)) = (
                    self.video_ref.cast::<HtmlVideoElement>(),
                    self.canvas_ref.cast::<HtmlCanvasElement>(),
                ) else {
                    return false;
                };
                match decoder::decode_video_frame(&video, &canvas) {
                    Ok(DecodeOutcome::Decoded(text)) => {
                        log::info!("decoded symbol: {text}");
                        // State first, then the payload.
                        self.report_state(ctx, ScannerState::Scanning);
                        ctx.props().on_scan_success.emit(text);
                        true
                    }
                    Ok(DecodeOutcome::NoSymbol) => false,
                    Err(error) => {
                        self.fail(ctx, error);
                        true
                    }
                }
            }
            ScannerMessage::FocusTick => {
                if !self.running {
                    return false;
                }
                let had_point = self.focus.intent.point().is_some();
                if let Some(plan) = self.focus.tick(js_sys::Date::now()) {
                    if let Some(track) = self.video_track() {
                        spawn_apply(track, plan);
                    }
                }
                // Rerender only when an expired tap indicator was cleared.
                had_point && self.focus.intent.point().is_none()
            }
            ScannerMessage::Tapped(event) => {
                if !self.running {
                    return false;
                }
                let Some(video) = self.video_ref.cast::<HtmlVideoElement>() else {
                    return false;
                };
                let rect = video.get_bounding_client_rect();
                if rect.width() <= 0.0 || rect.height() <= 0.0 {
                    return false;
                }
                let point = FocusPoint {
                    x: ((event.client_x() as f64 - rect.left()) / rect.width()).clamp(0.0, 1.0),
                    y: ((event.client_y() as f64 - rect.top()) / rect.height()).clamp(0.0, 1.0),
                };
                log::debug!("tap to focus at ({:.2}, {:.2})", point.x, point.y);
                match self.focus.tap(point, js_sys::Date::now()) {
                    Some(ManualFocus::Constraints(plan)) => {
                        if let Some(track) = self.video_track() {
                            spawn_apply(track, plan);
                        }
                    }
                    Some(ManualFocus::Reacquire) => self.reacquire_stream(ctx),
                    None => {}
                }
                focus::vibrate(focus::TAP_VIBRATE_MS);
                true
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let onclick = ctx.link().callback(ScannerMessage::Tapped);
        let ontimeupdate = ctx.link().callback(|_| ScannerMessage::VideoReady);
        html! {
            <>
                <style>
                    {"
                        .scanner-shell {
                            position: relative;
                            width: 100%;
                            max-width: 28rem;
                            margin: 0 auto;
                        }
                        .scanner-video {
                            width: 100%;
                            height: auto;
                            border-radius: 0.5rem;
                            background-color: #000;
                        }
                        .scanner-canvas { display: none; }
                        .scanner-badge {
                            position: absolute;
                            top: 1rem;
                            left: 1rem;
                            padding: 0.25rem 0.75rem;
                            border-radius: 9999px;
                            color: #fff;
                            font-size: 0.875rem;
                        }
                        .scanner-badge.active { background-color: #22c55e; }
                        .scanner-badge.scanning { background-color: #3b82f6; }
                        .scanner-overlay {
                            position: absolute;
                            inset: 0;
                            display: flex;
                            align-items: center;
                            justify-content: center;
                            background-color: rgba(0, 0, 0, 0.75);
                            border-radius: 0.5rem;
                            color: #fff;
                            text-align: center;
                            padding: 1rem;
                        }
                        .scanner-overlay .error-title { color: #f87171; }
                        .focus-ring {
                            position: absolute;
                            width: 3rem;
                            height: 3rem;
                            margin: -1.5rem 0 0 -1.5rem;
                            border: 2px solid #fbbf24;
                            border-radius: 9999px;
                            pointer-events: none;
                        }
                    "}
                </style>
                if ctx.props().is_active {
                    <div class={classes!("scanner-shell", ctx.props().class.clone())}>
                        <video
                            ref={&self.video_ref}
                            class="scanner-video"
                            autoplay=true
                            playsinline=true
                            muted=true
                            onclick={onclick}
                            ontimeupdate={ontimeupdate}
                        />
                        <canvas ref={&self.canvas_ref} class="scanner-canvas"></canvas>
                        { self.state_overlay() }
                        { self.focus_indicator() }
                    </div>
                }
            </>
        }
    }
}

impl Scanner {
    /// Start a new session. A call while one is active is a no-op.
    fn begin(&mut self, ctx: &Context<Self>) {
        if self.running {
            return;
        }
        self.running = true;
        self.generation += 1;
        self.session.clear_error();
        self.report_state(ctx, ScannerState::Initializing);
        let generation = self.generation;
        let facing = ctx.props().facing_mode;
        ctx.link().send_future(async move {
            match decoder::open_camera(facing).await {
                Ok(stream) => ScannerMessage::StreamReady(generation, stream),
                Err(error) => ScannerMessage::StartFailed(generation, error),
            }
        });
    }

    /// Release everything and report `inactive`. Idempotent; every exit path
    /// (deactivation, unmount, error) funnels through `release_media`.
    fn teardown(&mut self, ctx: &Context<Self>) {
        self.release_media();
        self.running = false;
        self.generation += 1;
        self.focus.reset();
        if let Some(state) = self.session.reset() {
            ctx.props().on_state_change.emit(state);
        }
    }

    fn release_media(&mut self) {
        if let Some(interval) = self.decode_interval.take() {
            interval.cancel();
        }
        if let Some(interval) = self.focus_interval.take() {
            interval.cancel();
        }
        if let Some(stream) = self.stream.take() {
            decoder::stop_tracks(&stream);
        }
        if let Some(video) = self.video_ref.cast::<HtmlVideoElement>() {
            video.set_src_object(None);
        }
    }

    /// Unrecoverable failure: release the camera, surface the translated
    /// message once and stay in `error` until the user reactivates.
    fn fail(&mut self, ctx: &Context<Self>, error: CameraError) {
        log::error!("scanner failed: {error}");
        self.release_media();
        self.running = false;
        self.generation += 1;
        self.focus.reset();
        let message = error.to_string();
        ctx.props().on_scan_error.emit(message.clone());
        if let Some(state) = self.session.record_error(message) {
            ctx.props().on_state_change.emit(state);
        }
        if error.is_permission_denied() {
            self.report_permission(ctx, PermissionState::Denied);
        }
    }

    fn report_state(&mut self, ctx: &Context<Self>, next: ScannerState) {
        if let Some(state) = self.session.set_state(next) {
            ctx.props().on_state_change.emit(state);
        }
    }

    fn report_permission(&mut self, ctx: &Context<Self>, next: PermissionState) {
        if let Some(permission) = self.session.set_permission(next) {
            ctx.props().on_permission_change.emit(permission);
        }
    }

    fn video_track(&self) -> Option<MediaStreamTrack> {
        let stream = self.stream.as_ref()?;
        stream
            .get_video_tracks()
            .get(0)
            .dyn_into::<MediaStreamTrack>()
            .ok()
    }

    /// Last-resort focus nudge for devices without any focus capability:
    /// drop the track and reacquire it with the same settings.
    fn reacquire_stream(&self, ctx: &Context<Self>) {
        log::debug!("no focus capability, reacquiring track");
        let generation = self.generation;
        let facing = ctx.props().facing_mode;
        let link = ctx.link().clone();
        wasm_bindgen_futures::spawn_local(async move {
            match decoder::open_camera(facing).await {
                Ok(stream) => {
                    link.send_message(ScannerMessage::StreamReacquired(generation, stream))
                }
                Err(error) => log::debug!("track reacquire failed: {error}"),
            }
        });
    }

    fn state_overlay(&self) -> Html {
        match self.session.state() {
            ScannerState::Initializing => html! {
                <div class="scanner-overlay">
                    <p>{ "Инициализация камеры..." }</p>
                </div>
            },
            ScannerState::Active => html! {
                <div class="scanner-badge active">{ "Сканирование активно" }</div>
            },
            ScannerState::Scanning => html! {
                <div class="scanner-badge scanning">{ "Обработка штрихкода..." }</div>
            },
            ScannerState::Error => {
                let message = self.session.last_error().unwrap_or_default().to_string();
                html! {
                    <div class="scanner-overlay">
                        <div>
                            <p class="error-title">{ "⚠️ Ошибка камеры" }</p>
                            <p>{ message }</p>
                        </div>
                    </div>
                }
            }
            ScannerState::Inactive => html! {},
        }
    }

    fn focus_indicator(&self) -> Html {
        match self.focus.intent.point() {
            Some(point) => html! {
                <div
                    class="focus-ring"
                    style={format!("left: {:.1}%; top: {:.1}%;", point.x * 100.0, point.y * 100.0)}
                />
            },
            None => html! {},
        }
    }
}

fn spawn_apply(track: MediaStreamTrack, plan: ConstraintPlan) {
    wasm_bindgen_futures::spawn_local(async move {
        if let Err(err) = focus::apply_plan(&track, &plan).await {
            // Unsupported combinations are expected on some drivers.
            log::debug!("camera constraints rejected: {err:?}");
        }
    });
}
