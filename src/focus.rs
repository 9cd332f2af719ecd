//! Camera focus control for close-range barcode targets.
//!
//! Some camera drivers drift away from continuous autofocus over time, so a
//! plan of capture constraints is re-applied on a fixed interval. A manual
//! tap on the preview suspends that loop for a fixed hold window and biases
//! focus toward the tapped point instead.

use js_sys::Reflect;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{MediaStreamTrack, MediaTrackConstraints};

/// Automatic constraint re-application period.
pub const FOCUS_REAPPLY_INTERVAL_MS: u32 = 1_000;
/// How long a manual tap suspends the automatic loop.
pub const MANUAL_FOCUS_HOLD_MS: f64 = 10_000.0;
/// Typical barcode scanning distance band, in meters.
pub const SCAN_BAND_NEAR_M: f64 = 0.05;
pub const SCAN_BAND_FAR_M: f64 = 0.30;
/// Tactile confirmation of a tap.
pub const TAP_VIBRATE_MS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Normalized tap coordinate, both axes in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusPoint {
    pub x: f64,
    pub y: f64,
}

/// Typed view of the active track's capability set.
///
/// Every field is optional per device; absence of a capability is expected
/// and simply skips the corresponding constraint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraCapabilities {
    pub focus_modes: Vec<String>,
    pub focus_distance: Option<Range>,
    pub exposure_modes: Vec<String>,
    pub zoom: Option<Range>,
    pub sharpness: Option<Range>,
}

impl CameraCapabilities {
    /// Read `track.getCapabilities()`. The method and the focus/exposure
    /// fields are outside the standardized `MediaTrackCapabilities` surface,
    /// so everything goes through `Reflect` and absence reads as no
    /// capability.
    pub fn probe(track: &MediaStreamTrack) -> Self {
        let caps = raw_capabilities(track);
        Self {
            focus_modes: string_list(&caps, "focusMode"),
            focus_distance: range_of(&caps, "focusDistance"),
            exposure_modes: string_list(&caps, "exposureMode"),
            zoom: range_of(&caps, "zoom"),
            sharpness: range_of(&caps, "sharpness"),
        }
    }

    fn supports_focus_mode(&self, mode: &str) -> bool {
        self.focus_modes.iter().any(|m| m == mode)
    }
}

fn raw_capabilities(track: &MediaStreamTrack) -> JsValue {
    let track_js: &JsValue = track.as_ref();
    let Ok(getter) = Reflect::get(track_js, &JsValue::from_str("getCapabilities")) else {
        return JsValue::UNDEFINED;
    };
    let Ok(getter) = getter.dyn_into::<js_sys::Function>() else {
        return JsValue::UNDEFINED;
    };
    getter.call0(track_js).unwrap_or(JsValue::UNDEFINED)
}

fn string_list(caps: &JsValue, key: &str) -> Vec<String> {
    let Ok(value) = Reflect::get(caps, &JsValue::from_str(key)) else {
        return Vec::new();
    };
    if !js_sys::Array::is_array(&value) {
        return Vec::new();
    }
    js_sys::Array::from(&value)
        .iter()
        .filter_map(|entry| entry.as_string())
        .collect()
}

fn range_of(caps: &JsValue, key: &str) -> Option<Range> {
    let value = Reflect::get(caps, &JsValue::from_str(key)).ok()?;
    if value.is_undefined() || value.is_null() {
        return None;
    }
    let min = Reflect::get(&value, &JsValue::from_str("min")).ok()?.as_f64()?;
    let max = Reflect::get(&value, &JsValue::from_str("max")).ok()?.as_f64()?;
    Some(Range { min, max })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusMode {
    Auto,
    Manual,
}

/// User focus intent, read synchronously by the periodic tick.
///
/// The suspend timestamp lives here, outside the timer itself, so a tap can
/// set it without touching the timer's lifecycle and unrelated events (such
/// as decodes) cannot move it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusIntent {
    mode: FocusMode,
    point: Option<FocusPoint>,
    suspended_until: f64,
}

impl FocusIntent {
    pub fn new() -> Self {
        Self {
            mode: FocusMode::Auto,
            point: None,
            suspended_until: 0.0,
        }
    }

    pub fn mode(&self) -> FocusMode {
        self.mode
    }

    pub fn point(&self) -> Option<FocusPoint> {
        self.point
    }

    pub fn tap(&mut self, point: FocusPoint, now_ms: f64) {
        self.mode = FocusMode::Manual;
        self.point = Some(point);
        self.suspended_until = now_ms + MANUAL_FOCUS_HOLD_MS;
    }

    /// While true, the automatic loop must not touch the constraints.
    pub fn is_suspended(&self, now_ms: f64) -> bool {
        self.mode == FocusMode::Manual && now_ms < self.suspended_until
    }

    /// Clear an elapsed manual override; returns true when something cleared.
    pub fn expire(&mut self, now_ms: f64) -> bool {
        if self.mode == FocusMode::Manual && now_ms >= self.suspended_until {
            self.mode = FocusMode::Auto;
            self.point = None;
            return true;
        }
        false
    }
}

impl Default for FocusIntent {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Text(String),
    Number(f64),
    Point(FocusPoint),
}

/// One advanced-constraint entry, as (constraint name, value) pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintPlan {
    pub settings: Vec<(&'static str, SettingValue)>,
}

impl ConstraintPlan {
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

/// Constraints for unattended scanning: continuous autofocus, maximum
/// sharpness, continuous exposure, zoom locked at 1x. The focus distance is
/// deliberately left to the driver in automatic mode.
pub fn auto_plan(caps: &CameraCapabilities) -> ConstraintPlan {
    let mut plan = ConstraintPlan::default();
    if caps.supports_focus_mode("continuous") {
        plan.settings
            .push(("focusMode", SettingValue::Text("continuous".into())));
    } else if caps.supports_focus_mode("auto") {
        plan.settings
            .push(("focusMode", SettingValue::Text("auto".into())));
    }
    if let Some(sharpness) = &caps.sharpness {
        plan.settings
            .push(("sharpness", SettingValue::Number(sharpness.max)));
    }
    if caps.exposure_modes.iter().any(|m| m == "continuous") {
        plan.settings
            .push(("exposureMode", SettingValue::Text("continuous".into())));
    }
    if caps.zoom.map_or(false, |zoom| zoom.contains(1.0)) {
        plan.settings.push(("zoom", SettingValue::Number(1.0)));
    }
    plan
}

#[derive(Debug, Clone, PartialEq)]
pub enum ManualFocus {
    Constraints(ConstraintPlan),
    /// No focus capability at all: tear the track down and reacquire it to
    /// force the driver back into autofocus. Best-effort.
    Reacquire,
}

/// Pick the most precise supported way to honor a tap, in decreasing order:
/// point-of-interest, manual mode with a mapped distance, bare distance,
/// track reacquisition.
pub fn manual_plan(caps: &CameraCapabilities, point: FocusPoint) -> ManualFocus {
    if caps.supports_focus_mode("single-shot") {
        let mut plan = ConstraintPlan::default();
        plan.settings
            .push(("focusMode", SettingValue::Text("single-shot".into())));
        plan.settings
            .push(("pointsOfInterest", SettingValue::Point(point)));
        return ManualFocus::Constraints(plan);
    }
    if let Some(distance) = &caps.focus_distance {
        let mut plan = ConstraintPlan::default();
        if caps.supports_focus_mode("manual") {
            plan.settings
                .push(("focusMode", SettingValue::Text("manual".into())));
        }
        plan.settings.push((
            "focusDistance",
            SettingValue::Number(tap_focus_distance(distance, point.y)),
        ));
        return ManualFocus::Constraints(plan);
    }
    ManualFocus::Reacquire
}

/// Map the vertical tap coordinate to a focus distance: top of frame means
/// the far end of the range, bottom the near end, biased into the 5-30 cm
/// band where barcodes are held. Falls back to the raw device range when it
/// does not overlap the band.
pub fn tap_focus_distance(range: &Range, y: f64) -> f64 {
    let near = range.min.max(SCAN_BAND_NEAR_M);
    let far = range.max.min(SCAN_BAND_FAR_M);
    let (near, far) = if near <= far {
        (near, far)
    } else {
        (range.min, range.max)
    };
    let y = y.clamp(0.0, 1.0);
    far - (far - near) * y
}

/// Owns the focus intent and the probed capability set for one session.
pub struct FocusController {
    pub intent: FocusIntent,
    capabilities: Option<CameraCapabilities>,
}

impl FocusController {
    pub fn new() -> Self {
        Self {
            intent: FocusIntent::new(),
            capabilities: None,
        }
    }

    pub fn attach(&mut self, track: &MediaStreamTrack) {
        let caps = CameraCapabilities::probe(track);
        log::debug!(
            "camera capabilities: focus modes {:?}, distance {:?}, zoom {:?}",
            caps.focus_modes,
            caps.focus_distance,
            caps.zoom
        );
        self.capabilities = Some(caps);
    }

    pub fn reset(&mut self) {
        self.intent = FocusIntent::new();
        self.capabilities = None;
    }

    /// One periodic tick. Checks the manual-override window synchronously
    /// first; while it is open, nothing is applied.
    pub fn tick(&mut self, now_ms: f64) -> Option<ConstraintPlan> {
        if self.intent.is_suspended(now_ms) {
            return None;
        }
        self.intent.expire(now_ms);
        let caps = self.capabilities.as_ref()?;
        let plan = auto_plan(caps);
        if plan.is_empty() {
            None
        } else {
            Some(plan)
        }
    }

    /// Record a tap and decide how to honor it. The override window opens
    /// even when the device exposes no focus capability.
    pub fn tap(&mut self, point: FocusPoint, now_ms: f64) -> Option<ManualFocus> {
        self.intent.tap(point, now_ms);
        let caps = self.capabilities.as_ref()?;
        Some(manual_plan(caps, point))
    }
}

impl Default for FocusController {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply a plan as one advanced constraint set. Rejection is the caller's
/// business to swallow; an unsupported combination must not abort a session.
pub async fn apply_plan(
    track: &MediaStreamTrack,
    plan: &ConstraintPlan,
) -> Result<(), JsValue> {
    if plan.is_empty() {
        return Ok(());
    }
    let entry = js_sys::Object::new();
    for (name, value) in &plan.settings {
        let js_value: JsValue = match value {
            SettingValue::Text(text) => JsValue::from_str(text),
            SettingValue::Number(number) => JsValue::from_f64(*number),
            SettingValue::Point(point) => {
                let poi = js_sys::Object::new();
                Reflect::set(&poi, &JsValue::from_str("x"), &JsValue::from_f64(point.x))?;
                Reflect::set(&poi, &JsValue::from_str("y"), &JsValue::from_f64(point.y))?;
                let list = js_sys::Array::new();
                list.push(&poi);
                list.into()
            }
        };
        Reflect::set(&entry, &JsValue::from_str(name), &js_value)?;
    }
    let advanced = js_sys::Array::new();
    advanced.push(&entry);
    let mut constraints = MediaTrackConstraints::new();
    constraints.advanced(&advanced);
    JsFuture::from(track.apply_constraints_with_constraints(&constraints)?).await?;
    Ok(())
}

/// Brief haptic confirmation; not every device supports it and failure does
/// not matter.
pub fn vibrate(duration_ms: u32) {
    if let Some(window) = web_sys::window() {
        let _ = window.navigator().vibrate_with_duration(duration_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps_with_modes(modes: &[&str]) -> CameraCapabilities {
        CameraCapabilities {
            focus_modes: modes.iter().map(|m| m.to_string()).collect(),
            ..CameraCapabilities::default()
        }
    }

    #[test]
    fn bottom_of_frame_maps_near_the_scan_band_minimum() {
        // Device range [0.02, 0.5] m, tap near the bottom of the preview.
        let range = Range { min: 0.02, max: 0.5 };
        let distance = tap_focus_distance(&range, 0.9);
        assert!(
            (0.05..=0.1).contains(&distance),
            "expected a close-range distance, got {distance}"
        );
    }

    #[test]
    fn top_of_frame_maps_to_the_far_end_of_the_band() {
        let range = Range { min: 0.02, max: 0.5 };
        assert!((tap_focus_distance(&range, 0.0) - SCAN_BAND_FAR_M).abs() < 1e-9);
    }

    #[test]
    fn device_range_outside_the_band_falls_back_to_the_raw_range() {
        let range = Range { min: 0.5, max: 3.0 };
        assert!((tap_focus_distance(&range, 1.0) - 0.5).abs() < 1e-9);
        assert!((tap_focus_distance(&range, 0.0) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn tap_suspends_exactly_for_the_hold_window() {
        let mut intent = FocusIntent::new();
        let t0 = 1_000.0;
        intent.tap(FocusPoint { x: 0.5, y: 0.5 }, t0);
        assert!(intent.is_suspended(t0));
        assert!(intent.is_suspended(t0 + MANUAL_FOCUS_HOLD_MS - 1.0));
        assert!(!intent.is_suspended(t0 + MANUAL_FOCUS_HOLD_MS));
    }

    #[test]
    fn expiry_clears_the_manual_flag_and_the_point() {
        let mut intent = FocusIntent::new();
        intent.tap(FocusPoint { x: 0.2, y: 0.8 }, 0.0);
        assert!(!intent.expire(MANUAL_FOCUS_HOLD_MS - 1.0));
        assert_eq!(intent.mode(), FocusMode::Manual);
        assert!(intent.expire(MANUAL_FOCUS_HOLD_MS));
        assert_eq!(intent.mode(), FocusMode::Auto);
        assert_eq!(intent.point(), None);
    }

    #[test]
    fn auto_plan_prefers_continuous_focus() {
        let plan = auto_plan(&caps_with_modes(&["manual", "continuous", "auto"]));
        assert_eq!(
            plan.settings[0],
            ("focusMode", SettingValue::Text("continuous".into()))
        );
    }

    #[test]
    fn auto_plan_falls_back_to_auto_focus() {
        let plan = auto_plan(&caps_with_modes(&["manual", "auto"]));
        assert_eq!(
            plan.settings[0],
            ("focusMode", SettingValue::Text("auto".into()))
        );
    }

    #[test]
    fn auto_plan_never_pins_a_focus_distance() {
        let caps = CameraCapabilities {
            focus_modes: vec!["continuous".into()],
            focus_distance: Some(Range { min: 0.02, max: 0.5 }),
            ..CameraCapabilities::default()
        };
        let plan = auto_plan(&caps);
        assert!(plan.settings.iter().all(|(name, _)| *name != "focusDistance"));
    }

    #[test]
    fn auto_plan_applies_max_sharpness_and_unit_zoom() {
        let caps = CameraCapabilities {
            focus_modes: vec!["continuous".into()],
            exposure_modes: vec!["continuous".into(), "manual".into()],
            zoom: Some(Range { min: 1.0, max: 8.0 }),
            sharpness: Some(Range { min: 0.0, max: 5.0 }),
            ..CameraCapabilities::default()
        };
        let plan = auto_plan(&caps);
        assert!(plan
            .settings
            .contains(&("sharpness", SettingValue::Number(5.0))));
        assert!(plan
            .settings
            .contains(&("exposureMode", SettingValue::Text("continuous".into()))));
        assert!(plan.settings.contains(&("zoom", SettingValue::Number(1.0))));
    }

    #[test]
    fn auto_plan_skips_zoom_outside_its_range() {
        let caps = CameraCapabilities {
            zoom: Some(Range { min: 2.0, max: 4.0 }),
            ..CameraCapabilities::default()
        };
        assert!(auto_plan(&caps).is_empty());
    }

    #[test]
    fn auto_plan_is_empty_without_capabilities() {
        assert!(auto_plan(&CameraCapabilities::default()).is_empty());
    }

    #[test]
    fn manual_plan_prefers_point_of_interest() {
        let point = FocusPoint { x: 0.3, y: 0.7 };
        let caps = caps_with_modes(&["continuous", "single-shot"]);
        let ManualFocus::Constraints(plan) = manual_plan(&caps, point) else {
            panic!("expected constraints");
        };
        assert!(plan
            .settings
            .contains(&("focusMode", SettingValue::Text("single-shot".into()))));
        assert!(plan
            .settings
            .contains(&("pointsOfInterest", SettingValue::Point(point))));
    }

    #[test]
    fn manual_plan_uses_manual_mode_with_a_mapped_distance() {
        let caps = CameraCapabilities {
            focus_modes: vec!["continuous".into(), "manual".into()],
            focus_distance: Some(Range { min: 0.02, max: 0.5 }),
            ..CameraCapabilities::default()
        };
        let ManualFocus::Constraints(plan) =
            manual_plan(&caps, FocusPoint { x: 0.5, y: 0.9 })
        else {
            panic!("expected constraints");
        };
        assert_eq!(
            plan.settings[0],
            ("focusMode", SettingValue::Text("manual".into()))
        );
        let Some((_, SettingValue::Number(distance))) = plan
            .settings
            .iter()
            .find(|(name, _)| *name == "focusDistance")
        else {
            panic!("expected a focus distance");
        };
        assert!((0.05..=0.1).contains(distance));
    }

    #[test]
    fn manual_plan_with_distance_only_still_maps_the_tap() {
        let caps = CameraCapabilities {
            focus_distance: Some(Range { min: 0.02, max: 0.5 }),
            ..CameraCapabilities::default()
        };
        let ManualFocus::Constraints(plan) =
            manual_plan(&caps, FocusPoint { x: 0.5, y: 0.9 })
        else {
            panic!("expected constraints");
        };
        assert_eq!(plan.settings.len(), 1);
        assert_eq!(plan.settings[0].0, "focusDistance");
    }

    #[test]
    fn manual_plan_without_any_focus_capability_reacquires() {
        let caps = caps_with_modes(&["continuous"]);
        assert_eq!(
            manual_plan(&caps, FocusPoint { x: 0.1, y: 0.1 }),
            ManualFocus::Reacquire
        );
    }

    #[test]
    fn controller_tick_is_silent_during_the_override_window() {
        let mut controller = FocusController::new();
        controller.capabilities = Some(caps_with_modes(&["continuous"]));
        let t0 = 5_000.0;
        controller.tap(FocusPoint { x: 0.5, y: 0.5 }, t0);
        assert_eq!(controller.tick(t0 + 1_000.0), None);
        assert_eq!(controller.tick(t0 + MANUAL_FOCUS_HOLD_MS - 1.0), None);
    }

    #[test]
    fn controller_resumes_on_the_first_tick_after_expiry() {
        let mut controller = FocusController::new();
        controller.capabilities = Some(caps_with_modes(&["continuous"]));
        let t0 = 5_000.0;
        controller.tap(FocusPoint { x: 0.5, y: 0.5 }, t0);
        let plan = controller
            .tick(t0 + MANUAL_FOCUS_HOLD_MS)
            .expect("auto focus should resume");
        assert!(!plan.is_empty());
        assert_eq!(controller.intent.point(), None);
    }

    #[test]
    fn controller_tick_without_capabilities_does_nothing() {
        let mut controller = FocusController::new();
        assert_eq!(controller.tick(0.0), None);
    }

    #[test]
    fn tap_opens_the_window_even_without_capabilities() {
        let mut controller = FocusController::new();
        assert_eq!(controller.tap(FocusPoint { x: 0.5, y: 0.5 }, 100.0), None);
        assert!(controller.intent.is_suspended(101.0));
    }
}
