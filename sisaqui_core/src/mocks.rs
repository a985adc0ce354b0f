//! Test and helper mocks for sisaqui_core

use std::collections::VecDeque;
use std::time::Duration;

/// A link that never answers; useful to exercise timeouts and shutdown.
pub struct DeadLine;

impl sisaqui_traits::SerialLine for DeadLine {
    fn send(&mut self, _frame: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }

    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        std::thread::sleep(timeout.min(Duration::from_millis(5)));
        Ok(None)
    }

    fn clear_input(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// One scripted answer to a `read_line` call.
#[derive(Debug, Clone)]
pub enum Scripted {
    Line(String),
    Nothing,
    Fail(String),
}

/// Replays a fixed script of read results, then stays silent.
/// Every frame sent is recorded.
#[derive(Debug, Default)]
pub struct ScriptedLine {
    script: VecDeque<Scripted>,
    pub sent: Vec<Vec<u8>>,
    pub clears: usize,
}

impl ScriptedLine {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            script: script.into_iter().collect(),
            sent: Vec::new(),
            clears: 0,
        }
    }

    pub fn lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(lines.into_iter().map(|l| Scripted::Line(l.to_string())))
    }
}

impl sisaqui_traits::SerialLine for ScriptedLine {
    fn send(&mut self, frame: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.sent.push(frame.to_vec());
        Ok(())
    }

    fn read_line(
        &mut self,
        _timeout: Duration,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        match self.script.pop_front() {
            Some(Scripted::Line(l)) => Ok(Some(l)),
            Some(Scripted::Fail(msg)) => Err(msg.into()),
            Some(Scripted::Nothing) | None => Ok(None),
        }
    }

    fn clear_input(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.clears += 1;
        Ok(())
    }
}
