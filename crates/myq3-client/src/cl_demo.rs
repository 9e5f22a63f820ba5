// cl_demo.rs -- demo playback
//
// A demo is a recorded sequence of server messages. Playback feeds them to
// the receiver on demand: first until the gamestate has primed the session,
// then from the clock, one message at a time, whenever the presentation
// time catches up with the newest snapshot.

use std::collections::VecDeque;

use myq3_common::common::{com_printf, ComResult};
use myq3_common::qcommon::ConnState;

use crate::cl_cgame::CgameInit;
use crate::cl_main::cl_disconnect;
use crate::cl_parse::{cl_parse_server_message, ServerMessage};
use crate::cl_timing::{cl_read_demo_message, DemoRead, DemoReader};
use crate::client::ClientSession;

/// A demo whose messages are already decoded and held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDemo {
    messages: VecDeque<ServerMessage>,
}

impl MemoryDemo {
    pub fn new(messages: impl IntoIterator<Item = ServerMessage>) -> Self {
        Self {
            messages: messages.into_iter().collect(),
        }
    }

    /// Messages not read yet.
    pub fn remaining(&self) -> usize {
        self.messages.len()
    }
}

impl DemoReader for MemoryDemo {
    fn read_demo_message(&mut self, session: &mut ClientSession) -> ComResult<DemoRead> {
        match self.messages.pop_front() {
            Some(msg) => {
                cl_parse_server_message(session, msg)?;
                Ok(DemoRead::Message)
            }
            None => Ok(DemoRead::EndOfDemo),
        }
    }
}

/// Start playing `demo` on session `s`. Reads messages until the gamestate
/// has been parsed and returns the presentation module's init parameters,
/// or `None` if the demo ended first.
pub fn cl_play_demo(
    s: &mut ClientSession,
    demo: &mut dyn DemoReader,
    sys_msec: i32,
) -> ComResult<Option<CgameInit>> {
    cl_disconnect(s);

    s.clc.state = ConnState::Connected;
    s.clc.demoplaying = true;

    // read demo messages until connected
    while s.clc.state >= ConnState::Connected && s.clc.state < ConnState::Primed {
        cl_read_demo_message(s, demo, sys_msec)?;
    }

    // don't get the first snapshot this frame, the time spent loading the
    // gamestate would show up as a time skip
    s.clc.first_demo_frame_skipped = false;

    Ok(s.cls.pending_cgame_init.take())
}

/// The demo ran out of messages at wall time `sys_msec`.
pub fn cl_demo_completed(s: &mut ClientSession, sys_msec: i32) {
    if s.cvar.integer_by_handle(s.cvars.cl_timedemo) != 0 {
        let summary = s.clc.timedemo.summary(sys_msec);
        if let Some(summary) = summary {
            com_printf(&format!("{}\n", summary));
        }
        s.cls.timedemo_result = summary;
    }

    cl_disconnect(s);
}
