//! Workout timeline execution engine.
//!
//! Drives the ERG session state machine off an external 1 Hz tick:
//! `Idle -> PendingStart -> Running <-> Paused -> Idle`, with an orthogonal
//! pending-modification overlay fed by coach feedback. The engine is
//! synchronous; device IO, HTTP and persistence all sit behind injected
//! collaborators so the whole state machine is testable without hardware.

use crate::coach::types::{FeedbackRequest, FeedbackResponse, RecentAverages};
use crate::devices::types::{TelemetryCell, TrainerControl};
use crate::metrics::calculator;
use crate::recording::types::{RideRecord, RideSink, WorkoutDataPoint};
use crate::workout::types::{ModificationKind, PendingModification, Workout, WorkoutError};
use chrono::{DateTime, Utc};
use crossbeam::channel::{Receiver, Sender};
use std::sync::Arc;
use uuid::Uuid;

/// Power above which the rider counts as pedaling.
const PEDAL_START_THRESHOLD_WATTS: i16 = 10;

/// Target power issued after a workout ends, so the trainer never stays
/// loaded at the last interval's wattage.
const STOP_FALLBACK_WATTS: i16 = 100;

/// Minimum recorded samples before feedback is worth requesting.
const FEEDBACK_MIN_POINTS: usize = 30;

/// Minimum seconds between feedback requests.
const FEEDBACK_SPACING_SECS: u32 = 60;

/// Samples averaged into a feedback request.
const FEEDBACK_WINDOW_POINTS: usize = 60;

/// Shortest an interval may become through a duration modification.
const MIN_INTERVAL_SECS: u32 = 10;

/// Execution phase of an active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RidePhase {
    /// Waiting for the rider to start pedaling
    PendingStart,
    /// Clock running, samples being recorded
    Running,
}

/// State of the active session. `None` on the engine means Idle.
#[derive(Debug)]
pub struct RideState {
    /// Session identity; guards against stale coach responses
    pub session: Uuid,
    /// The workout being ridden (copied, so modifications stay local)
    pub workout: Workout,
    /// Current phase
    pub phase: RidePhase,
    /// Paused flag; paused ticks are complete no-ops
    pub paused: bool,
    /// Index of the interval in progress
    pub active_index: usize,
    /// Seconds of running time since the workout began
    pub elapsed_secs: u32,
    /// Seconds of running time within the active interval
    pub interval_elapsed_secs: u32,
    /// Wall-clock start in milliseconds since the Unix epoch
    pub started_at_ms: i64,
    /// One sample per running second
    pub points: Vec<WorkoutDataPoint>,
    /// Suggestion awaiting rider approval, at most one
    pub pending: Option<PendingModification>,
    /// Elapsed seconds when feedback was last requested or the interval
    /// changed, whichever came later
    pub last_feedback_elapsed: u32,
}

/// Channel pair linking the engine to the coach worker.
pub struct CoachChannel {
    pub tx: Sender<FeedbackRequest>,
    pub rx: Receiver<FeedbackResponse>,
}

/// The ERG session engine. One instance per rider.
pub struct WorkoutTimeline {
    /// Target power sink
    trainer: Arc<dyn TrainerControl>,
    /// Latest-value telemetry, sampled once per tick
    telemetry: TelemetryCell,
    /// Completed-ride destination
    sink: Box<dyn RideSink>,
    /// Coach feedback channels, if configured
    coach: Option<CoachChannel>,
    /// Rider's FTP for summary metrics
    ftp: u16,
    /// Rider name forwarded to the coach
    user_name: Option<String>,
    /// Active session, `None` when idle
    state: Option<RideState>,
    /// Most recent coach message, for display
    last_feedback_message: Option<String>,
}

impl WorkoutTimeline {
    pub fn new(
        trainer: Arc<dyn TrainerControl>,
        telemetry: TelemetryCell,
        sink: Box<dyn RideSink>,
        ftp: u16,
    ) -> Self {
        Self {
            trainer,
            telemetry,
            sink,
            coach: None,
            ftp,
            user_name: None,
            state: None,
            last_feedback_message: None,
        }
    }

    /// Attach the coach worker channels.
    pub fn with_coach(
        mut self,
        tx: Sender<FeedbackRequest>,
        rx: Receiver<FeedbackResponse>,
    ) -> Self {
        self.coach = Some(CoachChannel { tx, rx });
        self
    }

    pub fn set_user_name(&mut self, name: Option<String>) {
        self.user_name = name;
    }

    pub fn set_ftp(&mut self, ftp: u16) {
        self.ftp = ftp;
    }

    /// The active session state, if any.
    pub fn state(&self) -> Option<&RideState> {
        self.state.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// Most recent coach message.
    pub fn last_feedback_message(&self) -> Option<&str> {
        self.last_feedback_message.as_deref()
    }

    /// Start a workout. An already-active workout is stopped (and its ride
    /// recorded) first. The first interval's target power is issued
    /// immediately so the trainer is loaded when pedaling begins.
    pub fn start_workout(&mut self, workout: Workout, now_ms: i64) -> Result<(), WorkoutError> {
        if workout.intervals.is_empty() {
            return Err(WorkoutError::EmptyWorkout);
        }

        if self.state.is_some() {
            tracing::info!("Replacing active workout");
            self.stop_workout(now_ms);
        }

        let first_power = workout.intervals[0].target_power;
        tracing::info!(
            "Starting workout '{}' ({} intervals), waiting for pedaling",
            workout.name,
            workout.intervals.len()
        );

        self.state = Some(RideState {
            session: Uuid::new_v4(),
            workout,
            phase: RidePhase::PendingStart,
            paused: false,
            active_index: 0,
            elapsed_secs: 0,
            interval_elapsed_secs: 0,
            started_at_ms: now_ms,
            points: Vec::new(),
            pending: None,
            last_feedback_elapsed: 0,
        });
        self.last_feedback_message = None;

        self.trainer.set_target_power(first_power as i16);
        Ok(())
    }

    /// Advance the session by one second.
    ///
    /// Called externally at 1 Hz. A no-op while idle or paused; while
    /// pending-start, waits for power above the pedaling threshold and the
    /// first tick past it already counts as a full running second.
    pub fn tick(&mut self, now_ms: i64) {
        self.drain_coach_responses();

        let snapshot = self.telemetry.sample();

        let mut finished = false;
        let mut feedback: Option<FeedbackRequest> = None;

        {
            let Some(state) = self.state.as_mut() else {
                return;
            };
            if state.paused {
                return;
            }

            if state.phase == RidePhase::PendingStart {
                if snapshot.power.unwrap_or(0) <= PEDAL_START_THRESHOLD_WATTS {
                    return;
                }
                state.phase = RidePhase::Running;
                tracing::info!("Pedaling detected, workout running");
            }

            state.points.push(WorkoutDataPoint {
                timestamp_ms: now_ms,
                power: snapshot.power.unwrap_or(0),
                heart_rate: snapshot.heart_rate.unwrap_or(0),
                cadence: snapshot.cadence.unwrap_or(0),
            });
            state.elapsed_secs += 1;
            state.interval_elapsed_secs += 1;

            let duration = state.workout.intervals[state.active_index].duration_secs;
            if state.interval_elapsed_secs >= duration {
                if state.active_index + 1 < state.workout.intervals.len() {
                    state.active_index += 1;
                    state.interval_elapsed_secs = 0;
                    state.last_feedback_elapsed = state.elapsed_secs;
                    let next = state.workout.intervals[state.active_index].target_power;
                    tracing::info!(
                        "Advancing to interval {} at {}W",
                        state.active_index,
                        next
                    );
                    self.trainer.set_target_power(next as i16);
                } else {
                    finished = true;
                }
            } else if self.coach.is_some()
                && state.points.len() >= FEEDBACK_MIN_POINTS
                && state.elapsed_secs - state.last_feedback_elapsed >= FEEDBACK_SPACING_SECS
            {
                state.last_feedback_elapsed = state.elapsed_secs;
                feedback = Some(Self::build_feedback_request(state, self.user_name.clone()));
            }
        }

        if let Some(request) = feedback {
            if let Some(coach) = &self.coach {
                if coach.tx.send(request).is_err() {
                    tracing::warn!("Coach worker unavailable, feedback request dropped");
                }
            }
        }

        if finished {
            tracing::info!("Workout complete");
            self.stop_workout(now_ms);
        }
    }

    /// Pause the session. Paused ticks advance nothing and record nothing.
    pub fn pause_workout(&mut self) -> Result<(), WorkoutError> {
        let state = self.state.as_mut().ok_or(WorkoutError::NoActiveWorkout)?;
        state.paused = true;
        tracing::info!("Workout paused");
        Ok(())
    }

    /// Resume a paused session.
    pub fn resume_workout(&mut self) -> Result<(), WorkoutError> {
        let state = self.state.as_mut().ok_or(WorkoutError::NoActiveWorkout)?;
        state.paused = false;
        tracing::info!("Workout resumed");
        Ok(())
    }

    /// Jump to the next interval immediately. The overall elapsed clock does
    /// not advance; only the interval clock resets. Skipping the final
    /// interval ends the workout.
    pub fn skip_interval(&mut self, now_ms: i64) -> Result<(), WorkoutError> {
        let mut finished = false;

        {
            let state = self.state.as_mut().ok_or(WorkoutError::NoActiveWorkout)?;

            if state.active_index + 1 < state.workout.intervals.len() {
                state.active_index += 1;
                state.interval_elapsed_secs = 0;
                state.last_feedback_elapsed = state.elapsed_secs;
                let next = state.workout.intervals[state.active_index].target_power;
                tracing::info!("Skipped to interval {} at {}W", state.active_index, next);
                self.trainer.set_target_power(next as i16);
            } else {
                finished = true;
            }
        }

        if finished {
            self.stop_workout(now_ms);
        }
        Ok(())
    }

    /// Accept the pending modification.
    ///
    /// A power delta applies to the current and every later interval
    /// (floored at 0 W) and the adjusted target is re-issued at once. A
    /// duration delta applies to the current interval only, floored at the
    /// minimum interval length.
    pub fn apply_modification(&mut self) -> Result<(), WorkoutError> {
        let state = self.state.as_mut().ok_or(WorkoutError::NoActiveWorkout)?;
        let modification = state
            .pending
            .take()
            .ok_or(WorkoutError::NoPendingModification)?;

        match modification.kind {
            ModificationKind::Power => {
                for interval in &mut state.workout.intervals[state.active_index..] {
                    interval.target_power = (interval.target_power as i32 + modification.value)
                        .clamp(0, u16::MAX as i32)
                        as u16;
                }
                let current = state.workout.intervals[state.active_index].target_power;
                tracing::info!(
                    "Applied {:+}W adjustment, current target {}W",
                    modification.value,
                    current
                );
                self.trainer.set_target_power(current as i16);
            }
            ModificationKind::Duration => {
                let interval = &mut state.workout.intervals[state.active_index];
                interval.duration_secs = (interval.duration_secs as i64
                    + modification.value as i64)
                    .max(MIN_INTERVAL_SECS as i64) as u32;
                state.workout.recompute_duration();
                tracing::info!("Adjusted interval duration by {:+}s", modification.value);
            }
        }

        Ok(())
    }

    /// Dismiss the pending modification without applying it.
    pub fn reject_modification(&mut self) -> Result<(), WorkoutError> {
        let state = self.state.as_mut().ok_or(WorkoutError::NoActiveWorkout)?;
        if state.pending.take().is_some() {
            tracing::info!("Suggestion dismissed");
        }
        Ok(())
    }

    /// End the session. Recorded data is summarized and handed to the sink;
    /// `save` and `export` run independently and their failures are logged,
    /// never propagated. Always finishes by loading the fallback wattage.
    pub fn stop_workout(&mut self, now_ms: i64) {
        let Some(state) = self.state.take() else {
            return;
        };

        if state.points.is_empty() {
            tracing::info!("Workout stopped before any data was recorded");
        } else {
            let summary = calculator::summarize(&state.points, self.ftp);
            let record = RideRecord {
                session: state.session,
                workout_id: state.workout.id,
                workout_name: state.workout.name.clone(),
                started_at: DateTime::from_timestamp_millis(state.started_at_ms)
                    .unwrap_or_else(Utc::now),
                finished_at: DateTime::from_timestamp_millis(now_ms).unwrap_or_else(Utc::now),
                points: state.points,
                summary,
            };

            if let Err(e) = self.sink.save(&record) {
                tracing::error!("Failed to save ride: {}", e);
            }
            match self.sink.export(&record) {
                Ok(path) => tracing::info!("Ride exported to {}", path.display()),
                Err(e) => tracing::error!("Failed to export ride: {}", e),
            }

            tracing::info!(
                "Workout stopped: {}s recorded, TSS {}",
                record.summary.duration_secs,
                record.summary.training_stress_score
            );
        }

        self.trainer.set_target_power(STOP_FALLBACK_WATTS);
    }

    fn build_feedback_request(state: &RideState, user_name: Option<String>) -> FeedbackRequest {
        let window =
            &state.points[state.points.len().saturating_sub(FEEDBACK_WINDOW_POINTS)..];
        let count = window.len() as f64;

        let interval = &state.workout.intervals[state.active_index];

        FeedbackRequest {
            session: state.session,
            interval_description: interval.description.clone(),
            target_power: interval.target_power,
            recent: RecentAverages {
                avg_power: window.iter().map(|p| p.power.max(0) as f64).sum::<f64>() / count,
                avg_heart_rate: window.iter().map(|p| p.heart_rate as f64).sum::<f64>() / count,
                avg_cadence: window.iter().map(|p| p.cadence as f64).sum::<f64>() / count,
            },
            user_name,
        }
    }

    /// Fold queued coach responses into the session. Responses from an
    /// earlier session are dropped; a carried suggestion replaces any
    /// pending one.
    fn drain_coach_responses(&mut self) {
        let Some(coach) = self.coach.as_ref() else {
            return;
        };

        while let Ok(response) = coach.rx.try_recv() {
            let Some(state) = self.state.as_mut() else {
                tracing::debug!("Dropping coach response with no active workout");
                continue;
            };
            if response.session != state.session {
                tracing::debug!("Dropping coach response from an earlier session");
                continue;
            }

            tracing::info!("Coach: {}", response.message);
            self.last_feedback_message = Some(response.message);

            if let Some(suggestion) = response.modification {
                state.pending = Some(PendingModification {
                    kind: suggestion.kind,
                    value: suggestion.value,
                    reason: suggestion.reason,
                });
            }
        }
    }
}
