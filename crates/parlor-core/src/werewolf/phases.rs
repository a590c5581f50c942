//! Phase transitions and the day-phase discussion timer.

use time::{Duration, OffsetDateTime};

use crate::event::{GameEvent, PhaseChangedPayload, EVENT_PHASE_CHANGED, SYSTEM_ACTOR};
use crate::game::{decode_payload, Action, GameError};

use super::config::Role;
use super::game::{
    Phase, WerewolfGame, ACTION_EXTEND_TIMER, ACTION_TOGGLE_TIMER, EVENT_INSOMNIAC_RESULT,
    EVENT_MASON_WAKEUP, EVENT_NIGHT_SCRIPT, EVENT_TIMER_EXTENDED, EVENT_TIMER_TOGGLED,
    EVENT_WEREWOLF_WAKEUP,
};
use super::narration::night_script;
use super::state::{
    ExtendTimerPayload, InsomniacResultPayload, MasonWakeupPayload, NightScriptPayload,
    TimerExtendedPayload, TimerToggledPayload, ToggleTimerPayload, WerewolfWakeupPayload,
};

const DEFAULT_TIMER_SECS: u64 = 180;
const DEFAULT_EXTEND_SECS: u64 = 60;

impl WerewolfGame {
    /// Role reveal -> night, once every player has acknowledged. Emits the
    /// role-scoped wakeups and the host's narration script.
    pub(super) fn advance_to_night(&mut self) -> Result<Vec<GameEvent>, GameError> {
        self.phase = Phase::Night;
        // Night has no automatic timer; the host advances manually.
        self.ends_at = None;

        let mut events = vec![GameEvent::new_public(
            EVENT_PHASE_CHANGED,
            SYSTEM_ACTOR,
            &PhaseChangedPayload {
                phase: self.phase_info(),
            },
        )?];

        // Werewolves open their eyes and find each other.
        let werewolves = self.players_with_role(Role::Werewolf);
        for werewolf in &werewolves {
            events.push(GameEvent::new_private(
                EVENT_WEREWOLF_WAKEUP,
                SYSTEM_ACTOR,
                &WerewolfWakeupPayload {
                    other_werewolves: werewolves
                        .iter()
                        .filter(|id| *id != werewolf)
                        .cloned()
                        .collect(),
                },
                vec![werewolf.clone()],
            )?);
        }

        // Masons likewise.
        let masons = self.players_with_role(Role::Mason);
        for mason in &masons {
            events.push(GameEvent::new_private(
                EVENT_MASON_WAKEUP,
                SYSTEM_ACTOR,
                &MasonWakeupPayload {
                    other_masons: masons
                        .iter()
                        .filter(|id| *id != mason)
                        .cloned()
                        .collect(),
                },
                vec![mason.clone()],
            )?);
        }

        // The host narrates the night from the full set of cards in play,
        // center cards included.
        if let Some(host_id) = self.host_id.clone() {
            let mut roles_in_play: Vec<Role> =
                self.role_assignments.values().copied().collect();
            roles_in_play.extend(&self.center_cards);

            events.push(GameEvent::new_private(
                EVENT_NIGHT_SCRIPT,
                SYSTEM_ACTOR,
                &NightScriptPayload {
                    script: night_script(&roles_in_play),
                },
                vec![host_id],
            )?);
        }

        Ok(events)
    }

    /// Night -> day. The insomniac learns where their card ended up.
    pub(super) fn advance_to_day(&mut self) -> Result<Vec<GameEvent>, GameError> {
        let mut events = Vec::new();

        for (player_id, dealt) in &self.original_roles {
            if *dealt == Role::Insomniac {
                events.push(GameEvent::new_private(
                    EVENT_INSOMNIAC_RESULT,
                    SYSTEM_ACTOR,
                    &InsomniacResultPayload {
                        final_role: self.role_assignments[player_id],
                    },
                    vec![player_id.clone()],
                )?);
            }
        }

        self.phase = Phase::Day;
        // The discussion timer starts off; the host enables it on demand.
        self.timer_active = false;
        self.ends_at = None;

        events.push(GameEvent::new_public(
            EVENT_PHASE_CHANGED,
            SYSTEM_ACTOR,
            &PhaseChangedPayload {
                phase: self.phase_info(),
            },
        )?);

        Ok(events)
    }

    pub(super) fn process_toggle_timer(
        &mut self,
        action: &Action,
    ) -> Result<Vec<GameEvent>, GameError> {
        let payload: ToggleTimerPayload = decode_payload(ACTION_TOGGLE_TIMER, &action.payload)?;
        let duration =
            Duration::seconds(payload.duration_secs.unwrap_or(DEFAULT_TIMER_SECS) as i64);

        self.timer_active = payload.enable;
        self.ends_at = if payload.enable {
            Some(OffsetDateTime::now_utc() + duration)
        } else {
            None
        };

        Ok(vec![GameEvent::new_public(
            EVENT_TIMER_TOGGLED,
            SYSTEM_ACTOR,
            &TimerToggledPayload {
                active: self.timer_active,
                ends_at: self.ends_at,
            },
        )?])
    }

    pub(super) fn process_extend_timer(
        &mut self,
        action: &Action,
    ) -> Result<Vec<GameEvent>, GameError> {
        let payload: ExtendTimerPayload = decode_payload(ACTION_EXTEND_TIMER, &action.payload)?;
        let seconds = payload.seconds.unwrap_or(DEFAULT_EXTEND_SECS);

        let ends_at = self
            .ends_at
            .ok_or(GameError::NotAllowed("timer is not active"))?
            + Duration::seconds(seconds as i64);
        self.ends_at = Some(ends_at);

        Ok(vec![GameEvent::new_public(
            EVENT_TIMER_EXTENDED,
            SYSTEM_ACTOR,
            &TimerExtendedPayload {
                ends_at,
                extended_by_secs: seconds,
            },
        )?])
    }

    /// Deadline sweep hook. Expiry never advances the phase or resolves
    /// votes; it only switches the countdown off and tells everyone.
    pub(super) fn process_timer_expiry(
        &mut self,
        now: OffsetDateTime,
    ) -> Result<Vec<GameEvent>, GameError> {
        if self.phase != Phase::Day || !self.timer_active {
            return Ok(Vec::new());
        }

        let expired = self.ends_at.is_some_and(|ends_at| now >= ends_at);
        if !expired {
            return Ok(Vec::new());
        }

        self.timer_active = false;
        self.ends_at = None;

        Ok(vec![GameEvent::new_public(
            EVENT_TIMER_TOGGLED,
            SYSTEM_ACTOR,
            &TimerToggledPayload {
                active: false,
                ends_at: None,
            },
        )?])
    }
}
