// cl_timing.rs -- presentation clock
//
// Turns the local real-time clock and the stream of snapshot timestamps into
// a smooth server time for the presentation module. The offset between the
// two clocks (server_time_delta) is re-estimated on every frame that brought
// new snapshots:
//
// - more than RESET_TIME off: snap to the new offset
// - more than FAST_ADJUST_TIME off: move halfway
// - otherwise: drift, -2 if we ran past the newest snapshot, +1 if not
//
// During demo playback the clock also drives the demo reader, pulling
// messages until a snapshot at or past the clock is available.

use std::fmt;

use myq3_common::common::{com_printf, ComError, ComResult};
use myq3_common::q_shared::SNAPFLAG_NOT_ACTIVE;
use myq3_common::qcommon::ConnState;

use crate::cl_demo::cl_demo_completed;
use crate::client::{ClientSession, MAX_TIMEDEMO_DURATIONS};

/// Offset error past which the clock is re-synced outright.
pub const RESET_TIME: i32 = 500;

/// Offset error past which the clock moves halfway to the new estimate.
pub const FAST_ADJUST_TIME: i32 = 100;

/// Bound on cl_timeNudge.
pub const MAX_TIME_NUDGE: i32 = 30;

/// How close to the newest snapshot the clock may run before the frame is
/// counted as extrapolated.
pub const EXTRAPOLATE_MARGIN: i32 = 5;

/// Simulated frame length during a timedemo.
pub const TIMEDEMO_FRAME_MSEC: i32 = 50;

// ============================================================
// Demo source
// ============================================================

/// What the demo reader did with one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoRead {
    /// One message was read and fed to the receiver.
    Message,
    /// The demo has no more messages.
    EndOfDemo,
}

/// Source of recorded server messages.
///
/// `read_demo_message` reads one message and applies it to the session,
/// typically through `cl_parse_server_message`.
pub trait DemoReader {
    fn read_demo_message(&mut self, session: &mut ClientSession) -> ComResult<DemoRead>;
}

/// Reader for live connections, where the clock never asks for a message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDemo;

impl DemoReader for NoDemo {
    fn read_demo_message(&mut self, _session: &mut ClientSession) -> ComResult<DemoRead> {
        Ok(DemoRead::EndOfDemo)
    }
}

/// Read one demo message, closing the demo when it runs out.
/// `sys_msec` must be on the same clock the timedemo frames were recorded on.
pub fn cl_read_demo_message(
    s: &mut ClientSession,
    demo: &mut dyn DemoReader,
    sys_msec: i32,
) -> ComResult<()> {
    match demo.read_demo_message(s)? {
        DemoRead::Message => Ok(()),
        DemoRead::EndOfDemo => {
            cl_demo_completed(s, sys_msec);
            Ok(())
        }
    }
}

// ============================================================
// Frame result
// ============================================================

/// What one clock step produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeAdvance {
    /// Not in game yet, nothing to present.
    Idle,
    /// A local server is paused, the clock did not move.
    Paused,
    /// The presentation module should render at `server_time`.
    Advanced { server_time: i32 },
    /// Demo playback ran out during this frame.
    DemoFinished,
}

// ============================================================
// Timedemo
// ============================================================

/// Frame accounting while a timedemo runs.
#[derive(Debug, Clone)]
pub struct TimedemoStats {
    pub base_time: i32, // each frame will be at this time + frame_num * 50
    pub start: Option<i32>,
    pub last_frame: i32,
    pub frames: i32,
    pub min_duration: i32,
    pub max_duration: i32,
    pub durations: Vec<u8>,
}

impl Default for TimedemoStats {
    fn default() -> Self {
        Self {
            base_time: 0,
            start: None,
            last_frame: 0,
            frames: 0,
            min_duration: i32::MAX,
            max_duration: 0,
            durations: vec![0; MAX_TIMEDEMO_DURATIONS],
        }
    }
}

impl TimedemoStats {
    /// Account for one presented frame at wall time `now`.
    pub fn record_frame(&mut self, now: i32) {
        let start = *self.start.get_or_insert(now);
        if self.frames == 0 {
            self.last_frame = start;
        }

        let duration = now - self.last_frame;
        self.last_frame = now;

        // the first frame has no previous frame to measure against
        if self.frames > 0 {
            self.max_duration = self.max_duration.max(duration);
            self.min_duration = self.min_duration.min(duration);
            let slot = (self.frames as usize - 1) % MAX_TIMEDEMO_DURATIONS;
            self.durations[slot] = duration.clamp(0, 255) as u8;
        }

        self.frames += 1;
    }

    /// Simulated server time for the current frame.
    pub fn frame_time(&self) -> i32 {
        self.base_time + self.frames * TIMEDEMO_FRAME_MSEC
    }

    /// Totals for the run so far, or `None` if nothing was measured.
    pub fn summary(&self, now: i32) -> Option<TimedemoSummary> {
        let start = self.start?;
        let elapsed = now - start;
        let measured = ((self.frames - 1).max(0) as usize).min(MAX_TIMEDEMO_DURATIONS);
        if elapsed <= 0 || measured == 0 {
            return None;
        }

        let samples = &self.durations[..measured];
        let avg = samples.iter().map(|&d| d as f32).sum::<f32>() / measured as f32;
        let variance = samples
            .iter()
            .map(|&d| {
                let x = d as f32 - avg;
                x * x
            })
            .sum::<f32>()
            / measured as f32;

        Some(TimedemoSummary {
            frames: self.frames,
            seconds: elapsed as f32 / 1000.0,
            fps: self.frames as f32 * 1000.0 / elapsed as f32,
            min: self.min_duration,
            avg,
            max: self.max_duration,
            std_dev: variance.sqrt(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedemoSummary {
    pub frames: i32,
    pub seconds: f32,
    pub fps: f32,
    pub min: i32,
    pub avg: f32,
    pub max: i32,
    pub std_dev: f32,
}

impl fmt::Display for TimedemoSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} frames {:.1} seconds {:.1} fps {}.0/{:.1}/{}.0/{:.1} ms",
            self.frames, self.seconds, self.fps, self.min, self.avg, self.max, self.std_dev
        )
    }
}

// ============================================================
// Clock
// ============================================================

/// Re-estimate server_time_delta after new snapshots arrived.
pub fn cl_adjust_time_delta(s: &mut ClientSession) {
    let clock = &mut s.cl.clock;
    clock.new_snapshots = false;

    // the delta never drifts when replaying a demo
    if s.clc.demoplaying {
        return;
    }

    let show = s.cvar.integer_by_handle(s.cvars.cl_show_time_delta) != 0;
    let new_delta = s.cl.snap.server_time - s.cls.realtime;
    let delta_delta = (new_delta - clock.server_time_delta).abs();

    if delta_delta > RESET_TIME {
        clock.server_time_delta = new_delta;
        // never hand out an earlier time than last frame
        let t = clock
            .presented
            .map_or(s.cl.snap.server_time, |p| p.max(s.cl.snap.server_time));
        clock.old_server_time = t;
        clock.server_time = t;
        if show {
            com_printf("<RESET> ");
        }
    } else if delta_delta > FAST_ADJUST_TIME {
        // fast adjust, cut the difference in half
        if show {
            com_printf("<FAST> ");
        }
        clock.server_time_delta = (clock.server_time_delta + new_delta) >> 1;
    } else {
        // slow drift adjust, only move 1 or 2 msec

        // if any of the frames between this and the previous snapshot had to
        // be extrapolated, nudge our sense of time back a little; the
        // granularity of +1 / -2 is too high for timescale modified frametimes
        let timescale = s.cvar.value_by_handle(s.cvars.timescale);
        if timescale == 0.0 || timescale == 1.0 {
            if clock.extrapolated_snapshot {
                clock.extrapolated_snapshot = false;
                clock.server_time_delta -= 2;
            } else {
                // otherwise, move our sense of time forward to minimize total latency
                clock.server_time_delta += 1;
            }
        }
    }

    if show {
        com_printf(&format!("{} ", clock.server_time_delta));
    }
}

/// Seed the clock from the first snapshot of a level and go active.
pub fn cl_first_snapshot(s: &mut ClientSession) {
    // ignore snapshots that don't have entities
    if s.cl.snap.snap_flags.contains(SNAPFLAG_NOT_ACTIVE) {
        return;
    }
    s.clc.state = ConnState::Active;

    // set the timedelta so we are exactly on this first frame
    let clock = &mut s.cl.clock;
    clock.server_time_delta = s.cl.snap.server_time - s.cls.realtime;
    clock.old_server_time = s.cl.snap.server_time;
    s.clc.timedemo.base_time = s.cl.snap.server_time;

    // if this is the first frame of active play, execute the contents of
    // activeAction
    let action = s.cvar.string_by_handle(s.cvars.active_action).to_string();
    if !action.is_empty() {
        s.cls.cbuf_add_text(&format!("{}\n", action));
        s.cvar.set("activeAction", "");
    }
}

/// Advance the presentation clock by one frame.
///
/// `sys_msec` is the wall clock, only consulted by timedemo accounting.
pub fn cl_set_cgame_time(
    s: &mut ClientSession,
    demo: &mut dyn DemoReader,
    sys_msec: i32,
) -> ComResult<TimeAdvance> {
    // getting a valid frame message ends the connection process
    if s.clc.state != ConnState::Active {
        if s.clc.state != ConnState::Primed {
            return Ok(TimeAdvance::Idle);
        }
        if s.clc.demoplaying {
            // we shouldn't get the first snapshot on the same frame
            // as the gamestate, because it causes a bad time skip
            if !s.clc.first_demo_frame_skipped {
                s.clc.first_demo_frame_skipped = true;
                return Ok(TimeAdvance::Idle);
            }
            cl_read_demo_message(s, demo, sys_msec)?;
        }
        if s.cl.clock.new_snapshots {
            s.cl.clock.new_snapshots = false;
            cl_first_snapshot(s);
        }
        if s.clc.state != ConnState::Active {
            return Ok(if s.clc.state == ConnState::Disconnected {
                TimeAdvance::DemoFinished
            } else {
                TimeAdvance::Idle
            });
        }
    }

    // if we have gotten to this point, cl.snap is guaranteed to be valid
    if !s.cl.snap.valid {
        return Err(ComError::drop("CL_SetCGameTime: !cl.snap.valid"));
    }

    // allow pause in single player
    if s.paused() {
        return Ok(TimeAdvance::Paused);
    }

    if s.cl.snap.server_time < s.cl.clock.old_frame_server_time {
        return Err(ComError::drop(
            "cl.snap.serverTime < cl.oldFrameServerTime",
        ));
    }
    s.cl.clock.old_frame_server_time = s.cl.snap.server_time;

    // get our current view of time
    let frozen = s.clc.demoplaying && s.cvar.integer_by_handle(s.cvars.cl_freeze_demo) != 0;
    if !frozen {
        // cl_timeNudge is a user adjustable cvar that allows more
        // or less latency to be added in the interest of better
        // smoothness or better responsiveness
        let tn = s
            .cvar
            .integer_by_handle(s.cvars.cl_time_nudge)
            .clamp(-MAX_TIME_NUDGE, MAX_TIME_NUDGE);

        let clock = &mut s.cl.clock;
        clock.server_time = s.cls.realtime + clock.server_time_delta - tn;

        // guarantee that time will never flow backwards, even if
        // serverTimeDelta made an adjustment or cl_timeNudge was changed
        if clock.server_time < clock.old_server_time {
            clock.server_time = clock.old_server_time;
        }
        clock.old_server_time = clock.server_time;

        // note if we are almost past the latest frame (without timeNudge),
        // so we will try and adjust back a bit when the next snapshot arrives
        if s.cls.realtime + clock.server_time_delta >= s.cl.snap.server_time - EXTRAPOLATE_MARGIN {
            clock.extrapolated_snapshot = true;
        }
    }

    // if we have gotten new snapshots, drift serverTimeDelta
    // don't do this every frame, or a period of packet loss would
    // make a huge adjustment
    if s.cl.clock.new_snapshots {
        cl_adjust_time_delta(s);
    }

    if s.clc.demoplaying {
        // if we are playing a demo back, we can just keep reading
        // messages from the demo file until the cgame definately
        // has valid snapshots to interpolate between

        // a timedemo will always use a deterministic set of time samples
        // no matter what speed machine it is run on,
        // while a normal demo may have different time samples
        // each time it is played back
        if s.cvar.integer_by_handle(s.cvars.cl_timedemo) != 0 {
            s.clc.timedemo.record_frame(sys_msec);
            s.cl.clock.server_time = s.clc.timedemo.frame_time();
        }

        while s.cl.clock.server_time >= s.cl.snap.server_time {
            // feed another message, which should change the contents of cl.snap
            cl_read_demo_message(s, demo, sys_msec)?;
            match s.clc.state {
                ConnState::Active => {}
                // the demo ran out
                ConnState::Disconnected => return Ok(TimeAdvance::DemoFinished),
                // a new level's gamestate, wait for its first snapshot
                _ => return Ok(TimeAdvance::Idle),
            }
        }
    }

    let server_time = s.cl.clock.server_time;
    if let Some(last) = s.cl.clock.presented {
        if server_time < last {
            return Err(ComError::drop(format!(
                "CL_SetCGameTime: time went backwards ({} < {})",
                server_time, last
            )));
        }
    }
    s.cl.clock.presented = Some(server_time);

    Ok(TimeAdvance::Advanced { server_time })
}

// ============================================================
// Tests
// ============================================================
