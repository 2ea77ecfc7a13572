pub(crate) mod held_buffer;
pub(crate) mod oneshot;

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_time::{Instant, Timer};
use heapless::Vec;
use heapless::index_map::FnvIndexMap;
use keyflow_types::action::{Action, KeyAction};
use keyflow_types::modifier::ModifierCombination;

use crate::config::InterruptPolicy;
use crate::deadline::{Deadline, DeadlineKind, DeadlineQueue};
use crate::event::{ActionSink, KeyPos, KeyboardEvent, OutputEvent};
use crate::keyboard::held_buffer::HeldBuffer;
use crate::keyboard::oneshot::OneShotState;
use crate::keymap::KeyMap;
use crate::overlay::{Intercept, ModeOverlay};
use crate::tap_dance::TapDanceKey;
use crate::tap_hold::{TapHoldDecision, TapHoldKey};

/// Max number of keys with timing state at the same time, must be a power of 2
pub(crate) const SLOT_STATE_NUM: usize = 16;
/// Max number of output events produced by one input event in the async runner
const OUTPUT_BUFFER_SIZE: usize = 64;

/// Transient state of a key slot, removed once the key is back to idle
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum SlotState {
    TapHold(TapHoldKey),
    TapDance(TapDanceKey),
    TapToggle(TapToggleKey),
}

/// A tap-toggle key counting quick taps
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct TapToggleKey {
    layer: u8,
    /// Quick taps so far, 0 once the key was held or interrupted
    taps: u8,
    id: u32,
    pressed: bool,
}

/// The event processing core.
///
/// Every raw key event goes through the mode overlay first, then the layer
/// stack picks the key's behavior, then the behavior's state machine decides
/// what to emit. Timeouts are deadlines fired by [`Keyboard::poll`], which
/// [`Keyboard::process`] also runs before handling an event.
pub struct Keyboard<const ROW: usize, const COL: usize, const NUM_LAYER: usize> {
    /// Keymap, with the layer state and the behavior config
    pub(crate) keymap: KeyMap<ROW, COL, NUM_LAYER>,

    overlay: ModeOverlay,

    /// Timing state of tap-hold, tap dance and tap-toggle keys
    slots: FnvIndexMap<KeyPos, SlotState, SLOT_STATE_NUM>,

    pub(crate) deadlines: DeadlineQueue,

    /// Events held back by a pending permissive-hold key
    held_buffer: HeldBuffer,

    /// Set while the held buffer is replayed
    replaying: bool,

    /// One shot layer state
    pub(crate) osl_state: OneShotState<u8>,

    /// Id of the latest one shot timeout
    pub(crate) osl_id: u32,

    /// Keys whose press was refused for lack of room, their release is dropped too
    refused: [[bool; COL]; ROW],
}

impl<const ROW: usize, const COL: usize, const NUM_LAYER: usize> Keyboard<ROW, COL, NUM_LAYER> {
    pub fn new(keymap: KeyMap<ROW, COL, NUM_LAYER>) -> Self {
        Self {
            keymap,
            overlay: ModeOverlay::new(),
            slots: FnvIndexMap::new(),
            deadlines: DeadlineQueue::new(),
            held_buffer: HeldBuffer::new(),
            replaying: false,
            osl_state: OneShotState::default(),
            osl_id: 0,
            refused: [[false; COL]; ROW],
        }
    }

    pub fn keymap(&self) -> &KeyMap<ROW, COL, NUM_LAYER> {
        &self.keymap
    }

    /// The active mode overlay, if any
    pub fn active_mode(&self) -> Option<u8> {
        self.overlay.active()
    }

    /// Whether no key has timing state or held back events
    pub fn is_idle(&self) -> bool {
        self.slots.is_empty() && self.held_buffer.is_empty()
    }

    /// Earliest instant at which [`Keyboard::poll`] has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.peek()
    }

    /// Process a key event.
    ///
    /// Deadlines due at or before the event's timestamp are fired first.
    pub fn process(&mut self, event: KeyboardEvent, sink: &mut impl ActionSink) {
        self.poll(event.time, sink);

        if !self.keymap.contains(event.pos) {
            warn!("Key event out of the matrix: {:?}", event);
            return;
        }

        self.process_inner(event, sink);
        self.flush_held_buffer(sink);
    }

    /// Fire every deadline due at `now`
    pub fn poll(&mut self, now: Instant, sink: &mut impl ActionSink) {
        while let Some(deadline) = self.deadlines.pop_due(now) {
            self.fire_deadline(deadline, sink);
            self.flush_held_buffer(sink);
        }
    }

    /// Run the keyboard: read key events from `events`, push resolved events to `outputs`.
    ///
    /// Deadlines are waited for with a timer, so held tap-hold keys resolve
    /// without any further key event.
    pub async fn run<M: RawMutex, const N: usize, const O: usize>(
        &mut self,
        events: Receiver<'_, M, KeyboardEvent, N>,
        outputs: Sender<'_, M, OutputEvent, O>,
    ) -> ! {
        loop {
            let mut out: Vec<OutputEvent, OUTPUT_BUFFER_SIZE> = Vec::new();
            match self.next_deadline() {
                Some(at) => match select(Timer::at(at), events.receive()).await {
                    Either::First(_) => self.poll(Instant::now(), &mut out),
                    Either::Second(event) => self.process(event, &mut out),
                },
                None => {
                    let event = events.receive().await;
                    self.process(event, &mut out);
                }
            }
            for e in out {
                outputs.send(e).await;
            }
        }
    }

    fn process_inner(&mut self, event: KeyboardEvent, sink: &mut impl ActionSink) {
        if !event.pressed && self.take_refused(event.pos) {
            debug!("Drop the release of refused key {:?}", event.pos);
            return;
        }

        // The mode overlay has the first right of refusal
        match self
            .overlay
            .intercept(&self.keymap.behavior.overlay.overlays, event.pos, event.pressed)
        {
            Intercept::PassThrough => (),
            Intercept::Action(action) => {
                debug!("Overlay action {:?}, pressed: {}", action, event.pressed);
                self.process_action(action, event, sink);
                return;
            }
            Intercept::Consumed => return,
            Intercept::Refused => {
                self.refuse(event.pos);
                return;
            }
        }

        if event.pressed {
            self.interrupt_tap_dances(event, sink);
            self.interrupt_tap_toggles(event.pos);
        }

        if self.hold_back_for_tap_hold(event, sink) {
            return;
        }

        let key_action = self.keymap.get_action_with_layer_cache(event.pos, event.pressed);
        self.process_key_action(key_action, event, sink);
    }

    fn process_key_action(&mut self, key_action: KeyAction, event: KeyboardEvent, sink: &mut impl ActionSink) {
        match key_action {
            KeyAction::No | KeyAction::Transparent => (),
            KeyAction::Single(a) => self.process_action(a, event, sink),
            KeyAction::TapHold(tap, hold) => self.process_tap_hold(tap, hold, event, sink),
            KeyAction::TapDance(index) => self.process_tap_dance(index, event, sink),
            KeyAction::LayerTapToggle(layer) => self.process_tap_toggle(layer, event),
        }

        if !matches!(key_action, KeyAction::Single(Action::OneShotLayer(_))) {
            self.update_osl(event);
        }
    }

    /// Execute a single action, the event decides press or release
    fn process_action(&mut self, action: Action, event: KeyboardEvent, sink: &mut impl ActionSink) {
        let pressed = event.pressed;
        match action {
            Action::No | Action::Transparent => (),
            Action::Key(code) => sink.emit(OutputEvent::key(code, pressed)),
            Action::KeyWithModifier(code, modifiers) => {
                sink.emit(OutputEvent::with_modifiers(code, modifiers, pressed))
            }
            Action::Modifier(modifiers) => self.process_modifiers(modifiers, pressed, sink),
            Action::LayerOn(layer) => {
                if pressed {
                    self.keymap.activate_layer(layer);
                } else {
                    self.keymap.deactivate_layer(layer);
                }
            }
            Action::LayerOff(layer) => {
                if pressed {
                    self.keymap.layer_off(layer);
                }
            }
            Action::LayerToggle(layer) => {
                if pressed {
                    self.keymap.toggle_layer(layer);
                }
            }
            Action::DefaultLayer(layer) => {
                if pressed {
                    self.keymap.set_default_layer(layer);
                }
            }
            Action::OneShotLayer(layer) => self.process_action_osl(layer, event),
            Action::ModeToggle(mode) => {
                if pressed {
                    self.overlay.toggle(mode);
                }
            }
            Action::ModeExit => {
                if pressed {
                    self.overlay.deactivate();
                }
            }
        }
    }

    /// Press modifiers in ctrl, shift, alt, gui order, release them in reverse
    fn process_modifiers(&mut self, modifiers: ModifierCombination, pressed: bool, sink: &mut impl ActionSink) {
        let keycodes = modifiers.to_modifier_keycodes();
        if pressed {
            keycodes.iter().for_each(|&k| sink.emit(OutputEvent::key(k, true)));
        } else {
            keycodes.iter().rev().for_each(|&k| sink.emit(OutputEvent::key(k, false)));
        }
    }

    /// Press and release an action at once
    fn tap_action(&mut self, action: Action, event: KeyboardEvent, sink: &mut impl ActionSink) {
        self.process_action(action, KeyboardEvent { pressed: true, ..event }, sink);
        self.process_action(action, KeyboardEvent { pressed: false, ..event }, sink);
    }

    /// Refuse a press, its release won't do anything either
    fn refuse(&mut self, pos: KeyPos) {
        error!("No room left for {:?}, the key press is dropped", pos);
        self.refused[pos.row as usize][pos.col as usize] = true;
    }

    fn take_refused(&mut self, pos: KeyPos) -> bool {
        core::mem::take(&mut self.refused[pos.row as usize][pos.col as usize])
    }

    /// Whether a timed state for `pos` can be stored and scheduled
    fn has_room_for(&self, pos: KeyPos) -> bool {
        !self.deadlines.is_full() && (self.slots.contains_key(&pos) || self.slots.len() < SLOT_STATE_NUM)
    }

    fn insert_slot(&mut self, pos: KeyPos, state: SlotState) {
        if self.slots.insert(pos, state).is_err() {
            // Checked by `has_room_for` beforehand
            error!("Too many keys with timing state, {:?} is dropped", pos);
        }
    }

    fn schedule(&mut self, pos: KeyPos, kind: DeadlineKind, at: Instant, id: u32) {
        if !self.deadlines.schedule(Deadline { at, pos, kind, id }) {
            error!("Deadline queue is full, {:?} has no timeout", pos);
        }
    }

    fn process_tap_hold(&mut self, tap: Action, hold: Action, event: KeyboardEvent, sink: &mut impl ActionSink) {
        if event.pressed {
            if !self.has_room_for(event.pos) {
                self.refuse(event.pos);
                return;
            }
            let id = self.deadlines.next_id();
            self.insert_slot(event.pos, SlotState::TapHold(TapHoldKey::press(tap, hold, event.time, id)));
            let at = event.time + self.keymap.behavior.tap_hold.tapping_term;
            self.schedule(event.pos, DeadlineKind::TapHold, at, id);
        } else if let Some(SlotState::TapHold(key)) = self.slots.get_mut(&event.pos) {
            let decision = key.on_release();
            self.slots.remove(&event.pos);
            self.apply_tap_hold_decision(decision, event, sink);
        }
    }

    fn apply_tap_hold_decision(&mut self, decision: TapHoldDecision, event: KeyboardEvent, sink: &mut impl ActionSink) {
        match decision {
            TapHoldDecision::Tap(action) => {
                debug!("Tap-hold key {:?} tapped: {:?}", event.pos, action);
                self.tap_action(action, event, sink);
            }
            TapHoldDecision::Hold(action) => {
                debug!("Tap-hold key {:?} held: {:?}", event.pos, action);
                self.process_action(action, KeyboardEvent { pressed: true, ..event }, sink);
            }
            TapHoldDecision::ReleaseHold(action) => {
                self.process_action(action, KeyboardEvent { pressed: false, ..event }, sink);
            }
            TapHoldDecision::Buffer | TapHoldDecision::Ignore => (),
        }
    }

    /// Slots of tap-hold keys still undecided, except `pos`
    fn pending_tap_holds(&self, pos: KeyPos) -> Vec<KeyPos, SLOT_STATE_NUM> {
        self.slots
            .iter()
            .filter(|(p, s)| **p != pos && matches!(s, SlotState::TapHold(k) if k.is_pending()))
            .map(|(p, _)| *p)
            .collect()
    }

    /// Apply the interrupt policy of pending tap-hold keys to another key's event.
    ///
    /// Returns true if the event is held back until the tap-hold keys are decided.
    fn hold_back_for_tap_hold(&mut self, event: KeyboardEvent, sink: &mut impl ActionSink) -> bool {
        let pending = self.pending_tap_holds(event.pos);
        if pending.is_empty() {
            return false;
        }

        let policy = self.keymap.behavior.tap_hold.interrupt_policy;
        if event.pressed {
            let mut buffered = false;
            for pos in pending {
                let Some(SlotState::TapHold(key)) = self.slots.get_mut(&pos) else {
                    continue;
                };
                match key.on_other_press(policy) {
                    TapHoldDecision::Buffer => buffered = true,
                    decision => {
                        let time = event.time;
                        self.apply_tap_hold_decision(decision, KeyboardEvent { pos, pressed: true, time }, sink);
                    }
                }
            }
            return buffered && self.hold_back(event, sink);
        }

        if self.held_buffer.has_press(event.pos) {
            if policy == InterruptPolicy::PermissiveHold {
                // A key pressed after the tap-hold key is released first
                self.force_hold_pending(event, sink);
            }
            return self.hold_back(event, sink);
        }

        // Released key was pressed before the tap-hold key, it only waits
        // behind events which are held back already
        !self.held_buffer.is_empty() && self.hold_back(event, sink)
    }

    /// Decide hold for every pending tap-hold key other than the event's
    fn force_hold_pending(&mut self, event: KeyboardEvent, sink: &mut impl ActionSink) {
        for pos in self.pending_tap_holds(event.pos) {
            if let Some(SlotState::TapHold(key)) = self.slots.get_mut(&pos) {
                let decision = key.force_hold();
                let time = event.time;
                self.apply_tap_hold_decision(decision, KeyboardEvent { pos, pressed: true, time }, sink);
            }
        }
    }

    /// Push `event` to the held buffer.
    ///
    /// A full buffer decides the pending tap-hold keys as hold and is replayed
    /// first. Returns false if the event is to be processed right away.
    fn hold_back(&mut self, event: KeyboardEvent, sink: &mut impl ActionSink) -> bool {
        if self.held_buffer.is_full() {
            warn!("Held buffer is full, pending tap-hold keys are held");
            self.force_hold_pending(event, sink);
            self.flush_held_buffer(sink);
            if self.held_buffer.is_empty() && !self.pending_tap_holds_any() {
                return false;
            }
        }
        match self.held_buffer.push(event) {
            Ok(()) => true,
            Err(e) if e.pressed => {
                // Refused, so it has no release to match either
                error!("Held buffer overflowed, {:?} is dropped", e);
                self.refuse(e.pos);
                true
            }
            // A release is never lost
            Err(_) => false,
        }
    }

    /// Replay held back events once no tap-hold key is pending
    fn flush_held_buffer(&mut self, sink: &mut impl ActionSink) {
        if self.replaying {
            return;
        }
        self.replaying = true;
        while !self.held_buffer.is_empty() && !self.pending_tap_holds_any() {
            let events = self.held_buffer.take();
            let mut iter = events.into_iter();
            while let Some(event) = iter.next() {
                self.process_inner(event, sink);
                if !self.held_buffer.is_empty() {
                    // The replayed event started a new hold back, keep the rest behind it
                    for e in iter.by_ref() {
                        if let Err(e) = self.held_buffer.push(e) {
                            error!("Held buffer overflowed while replaying, {:?} is dropped", e);
                        }
                    }
                    break;
                }
            }
        }
        self.replaying = false;
    }

    fn pending_tap_holds_any(&self) -> bool {
        self.slots
            .values()
            .any(|s| matches!(s, SlotState::TapHold(k) if k.is_pending()))
    }

    fn process_tap_dance(&mut self, index: u8, event: KeyboardEvent, sink: &mut impl ActionSink) {
        if event.pressed {
            if !self.has_room_for(event.pos) {
                self.refuse(event.pos);
                return;
            }
            let id = self.deadlines.next_id();
            let count = match self.slots.get_mut(&event.pos) {
                Some(SlotState::TapDance(key)) if key.is_counting() => key.on_press(event.time, id),
                _ => {
                    let mut key = TapDanceKey::new(index);
                    let count = key.on_press(event.time, id);
                    self.insert_slot(event.pos, SlotState::TapDance(key));
                    count
                }
            };
            debug!("Tap dance {} at {:?}, tap {}", index, event.pos, count);
            let at = event.time + self.keymap.behavior.tap_hold.tapping_term;
            self.schedule(event.pos, DeadlineKind::TapDance, at, id);
        } else if let Some(SlotState::TapDance(key)) = self.slots.get_mut(&event.pos) {
            if let Some(action) = key.on_release() {
                self.slots.remove(&event.pos);
                self.process_action(action, event, sink);
            }
        }
    }

    /// End the tap sequence at `pos`, by its deadline `id` or by interrupt when `id` is `None`
    fn resolve_tap_dance(&mut self, pos: KeyPos, id: Option<u32>, time: Instant, sink: &mut impl ActionSink) {
        let Some(SlotState::TapDance(key)) = self.slots.get_mut(&pos) else {
            debug!("Stale tap dance deadline at {:?}", pos);
            return;
        };
        let Some(tap_dance) = self.keymap.behavior.tap_dance.tap_dances.get(key.index as usize) else {
            return;
        };
        let Some((action, pressed)) = key.resolve(tap_dance, id) else {
            debug!("Stale tap dance deadline at {:?}", pos);
            return;
        };

        debug!("Tap dance at {:?} resolved: {:?}, held: {}", pos, action, pressed);
        let event = KeyboardEvent { pos, pressed: true, time };
        if pressed {
            // Released on the key's release
            self.process_action(action, event, sink);
        } else {
            self.slots.remove(&pos);
            self.tap_action(action, event, sink);
        }
    }

    /// A press on another slot ends every counting tap dance
    fn interrupt_tap_dances(&mut self, event: KeyboardEvent, sink: &mut impl ActionSink) {
        let counting: Vec<KeyPos, SLOT_STATE_NUM> = self
            .slots
            .iter()
            .filter(|(p, s)| **p != event.pos && matches!(s, SlotState::TapDance(k) if k.is_counting()))
            .map(|(p, _)| *p)
            .collect();
        for pos in counting {
            self.resolve_tap_dance(pos, None, event.time, sink);
        }
    }

    fn process_tap_toggle(&mut self, layer: u8, event: KeyboardEvent) {
        let tapping_toggle = self.keymap.behavior.tap_hold.tapping_toggle;
        if event.pressed {
            if !self.has_room_for(event.pos) {
                self.refuse(event.pos);
                return;
            }
            let taps = match self.slots.get(&event.pos) {
                Some(SlotState::TapToggle(key)) if key.taps > 0 => key.taps.saturating_add(1),
                _ => 1,
            };
            let id = self.deadlines.next_id();
            let key = TapToggleKey {
                layer,
                taps,
                id,
                pressed: true,
            };
            self.keymap.activate_layer(layer);
            self.insert_slot(event.pos, SlotState::TapToggle(key));
            let at = event.time + self.keymap.behavior.tap_hold.tapping_term;
            self.schedule(event.pos, DeadlineKind::TapToggle, at, id);
        } else {
            self.keymap.deactivate_layer(layer);
            if let Some(SlotState::TapToggle(key)) = self.slots.get_mut(&event.pos) {
                if key.taps >= tapping_toggle {
                    debug!("Tap toggle layer {} after {} taps", layer, key.taps);
                    self.keymap.toggle_layer(layer);
                    self.slots.remove(&event.pos);
                } else if key.taps == 0 {
                    self.slots.remove(&event.pos);
                } else {
                    key.pressed = false;
                }
            }
        }
    }

    /// Another key press resets the tap count of tap-toggle keys
    fn interrupt_tap_toggles(&mut self, pos: KeyPos) {
        let mut idle: Vec<KeyPos, SLOT_STATE_NUM> = Vec::new();
        for (p, state) in self.slots.iter_mut() {
            if let SlotState::TapToggle(key) = state {
                if *p == pos {
                    continue;
                }
                if key.pressed {
                    key.taps = 0;
                } else {
                    let _ = idle.push(*p);
                }
            }
        }
        for p in idle {
            self.slots.remove(&p);
        }
    }

    fn tap_toggle_timeout(&mut self, pos: KeyPos, id: u32) {
        let Some(SlotState::TapToggle(key)) = self.slots.get_mut(&pos) else {
            return;
        };
        if key.id != id {
            return;
        }
        if key.pressed {
            // Held past the tapping term, acts as a momentary layer only
            key.taps = 0;
        } else {
            self.slots.remove(&pos);
        }
    }

    fn fire_deadline(&mut self, deadline: Deadline, sink: &mut impl ActionSink) {
        let Deadline { at, pos, kind, id } = deadline;
        match kind {
            DeadlineKind::TapHold => {
                let decision = match self.slots.get_mut(&pos) {
                    Some(SlotState::TapHold(key)) => key.on_timeout(id),
                    _ => None,
                };
                match decision {
                    Some(decision) => {
                        self.apply_tap_hold_decision(decision, KeyboardEvent { pos, pressed: true, time: at }, sink)
                    }
                    None => debug!("Stale tap-hold deadline at {:?}", pos),
                }
            }
            DeadlineKind::TapDance => self.resolve_tap_dance(pos, Some(id), at, sink),
            DeadlineKind::TapToggle => self.tap_toggle_timeout(pos, id),
            DeadlineKind::OneShot => self.osl_timeout(id),
        }
    }
}
