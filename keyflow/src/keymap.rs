use heapless::Vec;
use keyflow_types::action::{Action, KeyAction};

use crate::config::BehaviorConfig;
use crate::error::KeyflowError;
use crate::event::KeyPos;
use crate::overlay::OverlayAction;

/// Keymap represents the stack of layers.
///
/// The conception of keymap is borrowed from qmk: <https://docs.qmk.fm/#/keymap>.
///
/// A layer can be active for several independent reasons at once: held by a
/// momentary key, toggled, armed by a one-shot key, or forced on by the
/// tri-layer rule. Each source is tracked separately so that removing one
/// never clears another.
///
/// Active layers are searched in this order:
/// 1. transient layers (momentary, one-shot, tri-layer), most recently activated first
/// 2. toggled layers, highest index first
/// 3. the default layer
pub struct KeyMap<const ROW: usize, const COL: usize, const NUM_LAYER: usize> {
    /// Layers
    pub(crate) layers: [[[KeyAction; COL]; ROW]; NUM_LAYER],
    /// Number of held momentary keys per layer
    momentary: [u8; NUM_LAYER],
    toggled: [bool; NUM_LAYER],
    oneshot: [bool; NUM_LAYER],
    /// Set by the tri-layer rule only
    tri: [bool; NUM_LAYER],
    /// Transient layers in activation order, the last one has the highest priority
    transient_order: Vec<u8, NUM_LAYER>,
    /// Default layer number
    default_layer: u8,
    /// Layer which resolved the binding of each pressed key
    layer_cache: [[u8; COL]; ROW],
    /// Options for configurable action behavior
    pub(crate) behavior: BehaviorConfig,
}

impl<const ROW: usize, const COL: usize, const NUM_LAYER: usize> KeyMap<ROW, COL, NUM_LAYER> {
    /// Build a keymap.
    ///
    /// Every layer, tap dance and mode reference in the keymap and in the
    /// behavior config is checked here, an inconsistent config is refused.
    pub fn new(layers: [[[KeyAction; COL]; ROW]; NUM_LAYER], behavior: BehaviorConfig) -> Result<Self, KeyflowError> {
        validate::<ROW, COL, NUM_LAYER>(&layers, &behavior)?;

        Ok(Self {
            layers,
            momentary: [0; NUM_LAYER],
            toggled: [false; NUM_LAYER],
            oneshot: [false; NUM_LAYER],
            tri: [false; NUM_LAYER],
            transient_order: Vec::new(),
            default_layer: 0,
            layer_cache: [[0; COL]; ROW],
            behavior,
        })
    }

    pub(crate) fn contains(&self, pos: KeyPos) -> bool {
        (pos.row as usize) < ROW && (pos.col as usize) < COL
    }

    /// Binding of `pos` on the highest priority active layer which isn't transparent there.
    ///
    /// A slot that is transparent on every active layer, or out of the
    /// matrix, resolves to `KeyAction::No`.
    pub fn resolve_behavior(&self, pos: KeyPos) -> KeyAction {
        if !self.contains(pos) {
            return KeyAction::No;
        }
        match self.resolve_layer(pos) {
            Some(layer) => self.layers[layer as usize][pos.row as usize][pos.col as usize],
            None => KeyAction::No,
        }
    }

    /// Fetch the action in keymap, with layer cache.
    ///
    /// A release always reads the layer which served the press, whatever
    /// happened to the layer state in between.
    pub(crate) fn get_action_with_layer_cache(&mut self, pos: KeyPos, pressed: bool) -> KeyAction {
        let row = pos.row as usize;
        let col = pos.col as usize;
        if !pressed {
            let layer = self.pop_layer_from_cache(row, col);
            return self.layers[layer as usize][row][col];
        }

        match self.resolve_layer(pos) {
            Some(layer) => {
                self.layer_cache[row][col] = layer;
                self.layers[layer as usize][row][col]
            }
            None => {
                // Transparent on every layer, the default layer entry is transparent too
                self.layer_cache[row][col] = self.default_layer;
                KeyAction::No
            }
        }
    }

    fn pop_layer_from_cache(&mut self, row: usize, col: usize) -> u8 {
        let layer = self.layer_cache[row][col];
        self.layer_cache[row][col] = self.default_layer;
        layer
    }

    fn resolve_layer(&self, pos: KeyPos) -> Option<u8> {
        let row = pos.row as usize;
        let col = pos.col as usize;
        self.find_layer(|layer| !self.layers[layer as usize][row][col].is_transparent())
    }

    /// Walk the active layers in priority order, returning the first one accepted by `pred`.
    fn find_layer(&self, mut pred: impl FnMut(u8) -> bool) -> Option<u8> {
        for &layer in self.transient_order.iter().rev() {
            if pred(layer) {
                return Some(layer);
            }
        }
        for layer in (0..NUM_LAYER).rev() {
            if self.toggled[layer] && !self.is_transient(layer as u8) && pred(layer as u8) {
                return Some(layer as u8);
            }
        }
        if pred(self.default_layer) {
            return Some(self.default_layer);
        }
        None
    }

    fn is_transient(&self, layer: u8) -> bool {
        let l = layer as usize;
        self.momentary[l] > 0 || self.oneshot[l] || self.tri[l]
    }

    /// Whether the layer takes part in resolution right now
    pub fn is_layer_active(&self, layer: u8) -> bool {
        let l = layer as usize;
        l < NUM_LAYER && (self.is_transient(layer) || self.toggled[l] || layer == self.default_layer)
    }

    /// The layer searched first
    pub fn get_activated_layer(&self) -> u8 {
        self.find_layer(|_| true).unwrap_or(self.default_layer)
    }

    pub fn get_default_layer(&self) -> u8 {
        self.default_layer
    }

    pub(crate) fn set_default_layer(&mut self, layer_num: u8) {
        if !self.valid_layer(layer_num) {
            return;
        }
        debug!("Default layer set to {}", layer_num);
        self.default_layer = layer_num;
        self.update_tri_layer();
    }

    /// Activate given layer while its key is held
    pub(crate) fn activate_layer(&mut self, layer_num: u8) {
        if !self.valid_layer(layer_num) {
            return;
        }
        self.momentary[layer_num as usize] = self.momentary[layer_num as usize].saturating_add(1);
        self.layer_state_changed(layer_num);
    }

    /// Release one momentary activation of given layer
    pub(crate) fn deactivate_layer(&mut self, layer_num: u8) {
        if !self.valid_layer(layer_num) {
            return;
        }
        self.momentary[layer_num as usize] = self.momentary[layer_num as usize].saturating_sub(1);
        self.layer_state_changed(layer_num);
    }

    /// Toggle given layer
    pub(crate) fn toggle_layer(&mut self, layer_num: u8) {
        if !self.valid_layer(layer_num) {
            return;
        }
        self.toggled[layer_num as usize] = !self.toggled[layer_num as usize];
        self.layer_state_changed(layer_num);
    }

    /// Turn given layer off, whatever activated it
    pub(crate) fn layer_off(&mut self, layer_num: u8) {
        if !self.valid_layer(layer_num) {
            return;
        }
        let l = layer_num as usize;
        self.momentary[l] = 0;
        self.toggled[l] = false;
        self.oneshot[l] = false;
        self.layer_state_changed(layer_num);
    }

    pub(crate) fn activate_oneshot(&mut self, layer_num: u8) {
        if !self.valid_layer(layer_num) {
            return;
        }
        self.oneshot[layer_num as usize] = true;
        self.layer_state_changed(layer_num);
    }

    pub(crate) fn deactivate_oneshot(&mut self, layer_num: u8) {
        if !self.valid_layer(layer_num) {
            return;
        }
        self.oneshot[layer_num as usize] = false;
        self.layer_state_changed(layer_num);
    }

    fn valid_layer(&self, layer_num: u8) -> bool {
        if layer_num as usize >= NUM_LAYER {
            warn!(
                "Not a valid layer {}, keyboard supports only {} layers",
                layer_num, NUM_LAYER
            );
            return false;
        }
        true
    }

    fn layer_state_changed(&mut self, layer_num: u8) {
        self.sync_transient_order(layer_num);
        self.update_tri_layer();
        debug!(
            "Layer {} changed, active: {}, highest: {}",
            layer_num,
            self.is_layer_active(layer_num),
            self.get_activated_layer()
        );
    }

    /// Keep `transient_order` in step with the transient sources of `layer_num`
    fn sync_transient_order(&mut self, layer_num: u8) {
        let listed = self.transient_order.iter().position(|&l| l == layer_num);
        match (self.is_transient(layer_num), listed) {
            (true, None) => {
                // Capacity equals NUM_LAYER and each layer is listed once
                let _ = self.transient_order.push(layer_num);
            }
            (false, Some(i)) => {
                self.transient_order.remove(i);
            }
            _ => (),
        }
    }

    /// Update tri-layer state.
    ///
    /// The adjust layer is forced on while lower and upper are both active.
    /// Running it again with the same state changes nothing.
    fn update_tri_layer(&mut self) {
        if let Some([lower, upper, adjust]) = self.behavior.tri_layer {
            let on = self.is_layer_active(lower) && self.is_layer_active(upper);
            if self.tri[adjust as usize] != on {
                debug!("Tri-layer {} {}", adjust, if on { "on" } else { "off" });
                self.tri[adjust as usize] = on;
                self.sync_transient_order(adjust);
            }
        }
    }
}

fn validate<const ROW: usize, const COL: usize, const NUM_LAYER: usize>(
    layers: &[[[KeyAction; COL]; ROW]; NUM_LAYER],
    behavior: &BehaviorConfig,
) -> Result<(), KeyflowError> {
    if NUM_LAYER == 0 {
        return Err(KeyflowError::EmptyKeymap);
    }
    if behavior.tap_hold.tapping_term.as_ticks() == 0 {
        return Err(KeyflowError::ZeroTappingTerm);
    }
    if let Some(tri) = behavior.tri_layer {
        for layer in tri {
            check_layer::<NUM_LAYER>(layer)?;
        }
        if tri[0] == tri[1] || tri[0] == tri[2] || tri[1] == tri[2] {
            return Err(KeyflowError::TriLayerSelfReference { layers: tri });
        }
    }

    let checker = Checker::<NUM_LAYER> {
        num_tap_dance: behavior.tap_dance.tap_dances.len(),
        num_mode: behavior.overlay.overlays.len(),
    };
    for action in layers.iter().flatten().flatten() {
        checker.key_action(action)?;
    }
    for tap_dance in behavior.tap_dance.tap_dances.iter() {
        for action in tap_dance.taps.iter().chain(core::iter::once(&tap_dance.hold)) {
            checker.action(action)?;
        }
    }
    for (mode, overlay) in behavior.overlay.overlays.iter().enumerate() {
        for &(pos, overlay_action) in overlay.bindings.iter() {
            if pos.row as usize >= ROW || pos.col as usize >= COL {
                return Err(KeyflowError::OverlaySlotOutOfRange { pos });
            }
            if let OverlayAction::Remap(action) = overlay_action {
                if !action.is_plain() {
                    return Err(KeyflowError::OverlayActionNotPlain { mode: mode as u8, pos });
                }
            }
        }
    }
    Ok(())
}

fn check_layer<const NUM_LAYER: usize>(layer: u8) -> Result<(), KeyflowError> {
    if layer as usize >= NUM_LAYER {
        return Err(KeyflowError::UndefinedLayer {
            layer,
            num_layer: NUM_LAYER,
        });
    }
    Ok(())
}

struct Checker<const NUM_LAYER: usize> {
    num_tap_dance: usize,
    num_mode: usize,
}

impl<const NUM_LAYER: usize> Checker<NUM_LAYER> {
    fn action(&self, action: &Action) -> Result<(), KeyflowError> {
        if let Some(layer) = action.layer() {
            check_layer::<NUM_LAYER>(layer)?;
        }
        if let Action::ModeToggle(mode) = *action {
            if mode as usize >= self.num_mode {
                return Err(KeyflowError::UndefinedMode { mode });
            }
        }
        Ok(())
    }

    fn key_action(&self, action: &KeyAction) -> Result<(), KeyflowError> {
        match action {
            KeyAction::Single(a) => self.action(a),
            KeyAction::TapHold(tap, hold) => {
                self.action(tap)?;
                self.action(hold)
            }
            KeyAction::TapDance(index) => {
                if *index as usize >= self.num_tap_dance {
                    return Err(KeyflowError::UndefinedTapDance { index: *index });
                }
                Ok(())
            }
            KeyAction::LayerTapToggle(layer) => check_layer::<NUM_LAYER>(*layer),
            KeyAction::No | KeyAction::Transparent => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use embassy_time::Duration;
    use keyflow_types::keycode::KeyCode;

    use super::*;
    use crate::config::TapHoldConfig;
    use crate::overlay::OverlayMap;
    use crate::{a, k, layer, mo, mode, td, tg};

    fn tri(layers: [u8; 3]) -> BehaviorConfig {
        BehaviorConfig {
            tri_layer: Some(layers),
            ..BehaviorConfig::default()
        }
    }

    #[rustfmt::skip]
    fn test_layers() -> [[[KeyAction; 3]; 1]; 4] {
        [
            layer!([[k!(A), k!(B), k!(C)]]),
            layer!([[k!(D), a!(Transparent), a!(Transparent)]]),
            layer!([[k!(E), k!(F), a!(Transparent)]]),
            layer!([[k!(G), a!(No), a!(Transparent)]]),
        ]
    }

    fn keymap() -> KeyMap<1, 3, 4> {
        KeyMap::new(test_layers(), tri([1, 2, 3])).unwrap()
    }

    #[test]
    fn test_transparent_falls_through() {
        let mut keymap = keymap();
        keymap.activate_layer(1);
        assert_eq!(keymap.resolve_behavior(KeyPos::new(0, 0)), k!(D));
        assert_eq!(keymap.resolve_behavior(KeyPos::new(0, 1)), k!(B));
    }

    #[test]
    fn test_out_of_matrix_resolves_to_no() {
        let keymap = keymap();
        assert_eq!(keymap.resolve_behavior(KeyPos::new(0, 3)), KeyAction::No);
        assert_eq!(keymap.resolve_behavior(KeyPos::new(1, 0)), KeyAction::No);
    }

    #[test]
    fn test_no_stops_search() {
        let mut keymap = keymap();
        keymap.activate_layer(1);
        keymap.activate_layer(2);
        // Layer 3 is on through the tri-layer rule and holds an explicit No
        assert_eq!(keymap.resolve_behavior(KeyPos::new(0, 1)), KeyAction::No);
        assert_eq!(keymap.resolve_behavior(KeyPos::new(0, 2)), k!(C));
    }

    #[test]
    fn test_most_recent_momentary_wins() {
        let layers = [
            layer!([[k!(A)]]),
            layer!([[k!(B)]]),
            layer!([[k!(C)]]),
        ];
        let mut keymap: KeyMap<1, 1, 3> = KeyMap::new(layers, BehaviorConfig::default()).unwrap();
        keymap.activate_layer(2);
        keymap.activate_layer(1);
        assert_eq!(keymap.resolve_behavior(KeyPos::new(0, 0)), k!(B));
        keymap.deactivate_layer(1);
        assert_eq!(keymap.resolve_behavior(KeyPos::new(0, 0)), k!(C));
    }

    #[test]
    fn test_momentary_above_toggled() {
        let layers = [
            layer!([[k!(A)]]),
            layer!([[k!(B)]]),
            layer!([[k!(C)]]),
        ];
        let mut keymap: KeyMap<1, 1, 3> = KeyMap::new(layers, BehaviorConfig::default()).unwrap();
        keymap.toggle_layer(2);
        keymap.activate_layer(1);
        assert_eq!(keymap.resolve_behavior(KeyPos::new(0, 0)), k!(B));
    }

    #[test]
    fn test_tri_layer_follows_both_layers() {
        let mut keymap = keymap();
        keymap.activate_layer(1);
        assert!(!keymap.is_layer_active(3));
        keymap.activate_layer(2);
        assert!(keymap.is_layer_active(3));
        keymap.deactivate_layer(1);
        assert!(!keymap.is_layer_active(3));
    }

    #[test]
    fn test_tri_layer_independent_of_own_toggle() {
        let mut keymap = keymap();
        keymap.toggle_layer(3);
        keymap.activate_layer(1);
        keymap.activate_layer(2);
        assert!(keymap.is_layer_active(3));
        keymap.deactivate_layer(2);
        // Still toggled on by its own key
        assert!(keymap.is_layer_active(3));
        keymap.toggle_layer(3);
        assert!(!keymap.is_layer_active(3));
        keymap.deactivate_layer(1);
        assert!(!keymap.is_layer_active(1));
        assert_eq!(keymap.get_activated_layer(), 0);
    }

    #[test]
    fn test_two_momentary_keys_same_layer() {
        let mut keymap = keymap();
        keymap.activate_layer(1);
        keymap.activate_layer(1);
        keymap.deactivate_layer(1);
        assert!(keymap.is_layer_active(1));
        keymap.deactivate_layer(1);
        assert!(!keymap.is_layer_active(1));
    }

    #[test]
    fn test_layer_cache_serves_release() {
        let mut keymap = keymap();
        keymap.activate_layer(1);
        let pressed = keymap.get_action_with_layer_cache(KeyPos::new(0, 0), true);
        keymap.deactivate_layer(1);
        let released = keymap.get_action_with_layer_cache(KeyPos::new(0, 0), false);
        assert_eq!(pressed, released);
        assert_eq!(released, k!(D));
    }

    #[test]
    fn test_layer_off_clears_all_sources() {
        let mut keymap = keymap();
        keymap.toggle_layer(2);
        keymap.activate_layer(2);
        keymap.layer_off(2);
        assert!(!keymap.is_layer_active(2));
    }

    #[test]
    fn test_reject_undefined_layer() {
        let layers = [layer!([[mo!(4), tg!(1)]]), layer!([[k!(A), k!(B)]])];
        assert_eq!(
            KeyMap::<1, 2, 2>::new(layers, BehaviorConfig::default()).err(),
            Some(KeyflowError::UndefinedLayer { layer: 4, num_layer: 2 })
        );
    }

    #[test]
    fn test_reject_self_referencing_tri_layer() {
        assert_eq!(
            KeyMap::new(test_layers(), tri([1, 1, 3])).err(),
            Some(KeyflowError::TriLayerSelfReference { layers: [1, 1, 3] })
        );
        assert!(matches!(
            KeyMap::new(test_layers(), tri([1, 2, 7])),
            Err(KeyflowError::UndefinedLayer { layer: 7, .. })
        ));
    }

    #[test]
    fn test_default_layer_switch() {
        let mut keymap = keymap();
        keymap.set_default_layer(2);
        assert_eq!(keymap.resolve_behavior(KeyPos::new(0, 0)), k!(E));
        // Transparent on layer 2 and every layer below it is inactive
        assert_eq!(keymap.resolve_behavior(KeyPos::new(0, 2)), KeyAction::No);
        assert_eq!(
            keymap.resolve_behavior(KeyPos::new(0, 1)),
            KeyAction::Single(Action::Key(KeyCode::F))
        );
    }

    #[test]
    fn test_reject_undefined_tap_dance_and_mode() {
        let layers = [layer!([[td!(0), k!(A)]])];
        assert_eq!(
            KeyMap::<1, 2, 1>::new(layers, BehaviorConfig::default()).err(),
            Some(KeyflowError::UndefinedTapDance { index: 0 })
        );
        let layers = [layer!([[k!(A), mode!(1)]])];
        assert_eq!(
            KeyMap::<1, 2, 1>::new(layers, BehaviorConfig::default()).err(),
            Some(KeyflowError::UndefinedMode { mode: 1 })
        );
    }

    #[test]
    fn test_reject_bad_overlay_entries() {
        let mut behavior = BehaviorConfig::default();
        let _ = behavior.overlay.overlays.push(
            OverlayMap::new().bind(KeyPos::new(0, 5), OverlayAction::Remap(Action::Key(KeyCode::Left))),
        );
        let layers = [layer!([[k!(A), mode!(0)]])];
        assert_eq!(
            KeyMap::<1, 2, 1>::new(layers, behavior.clone()).err(),
            Some(KeyflowError::OverlaySlotOutOfRange { pos: KeyPos::new(0, 5) })
        );

        behavior.overlay.overlays[0] =
            OverlayMap::new().bind(KeyPos::new(0, 0), OverlayAction::Remap(Action::LayerToggle(0)));
        assert_eq!(
            KeyMap::<1, 2, 1>::new(layers, behavior).err(),
            Some(KeyflowError::OverlayActionNotPlain {
                mode: 0,
                pos: KeyPos::new(0, 0)
            })
        );
    }

    #[test]
    fn test_reject_zero_tapping_term() {
        let behavior = BehaviorConfig {
            tap_hold: TapHoldConfig {
                tapping_term: Duration::from_millis(0),
                ..TapHoldConfig::default()
            },
            ..BehaviorConfig::default()
        };
        assert_eq!(
            KeyMap::<1, 1, 1>::new([layer!([[k!(A)]])], behavior).err(),
            Some(KeyflowError::ZeroTappingTerm)
        );
    }
}
