use super::{ProcessExit, ProcessHandle};
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExitState {
    Exited { exit: ProcessExit },
    /// Still running at the deadline; the process was killed and reaped.
    TimedOut,
    /// Liveness could not be determined; the process was killed and reaped.
    Lost { reason: String },
}

/// Polls `handle` every `poll` until it exits. With a `timeout`, a process still alive at
/// the deadline is killed and `ExitState::TimedOut` is returned.
pub fn wait_for_exit<H: ProcessHandle + ?Sized>(
    handle: &mut H,
    poll: Duration,
    timeout: Option<Duration>,
) -> ExitState {
    let mut handles = [handle];
    let mut states = wait_for_all(&mut handles, poll, timeout);
    states.pop().unwrap_or(ExitState::Lost {
        reason: "no state recorded".to_string(),
    })
}

/// Fan-in: returns only once every handle has exited, or has been killed and reaped after
/// the deadline or a failed liveness check. States are returned in handle order.
pub fn wait_for_all<H: ProcessHandle>(
    handles: &mut [H],
    poll: Duration,
    timeout: Option<Duration>,
) -> Vec<ExitState> {
    let deadline = timeout.map(|t| Instant::now() + t);
    let mut states: Vec<Option<ExitState>> = vec![None; handles.len()];

    loop {
        for (handle, state) in handles.iter_mut().zip(states.iter_mut()) {
            if state.is_some() {
                continue;
            }
            match handle.try_exit() {
                Ok(Some(exit)) => *state = Some(ExitState::Exited { exit }),
                Ok(None) => {}
                Err(err) => {
                    // Untracked from here on, so it must not outlive the fan-in.
                    let _ = handle.kill();
                    let _ = handle.wait();
                    *state = Some(ExitState::Lost {
                        reason: err.to_string(),
                    })
                }
            }
        }

        if states.iter().all(Option::is_some) {
            break;
        }

        let now = Instant::now();
        if let Some(deadline) = deadline {
            if now >= deadline {
                for (handle, state) in handles.iter_mut().zip(states.iter_mut()) {
                    if state.is_none() {
                        let _ = handle.kill();
                        let _ = handle.wait();
                        *state = Some(ExitState::TimedOut);
                    }
                }
                break;
            }
            thread::sleep(poll.min(deadline - now));
        } else {
            thread::sleep(poll);
        }
    }

    states.into_iter().flatten().collect()
}

impl<H: ProcessHandle + ?Sized> ProcessHandle for &mut H {
    fn id(&self) -> u32 {
        (**self).id()
    }

    fn try_exit(&mut self) -> std::io::Result<Option<ProcessExit>> {
        (**self).try_exit()
    }

    fn kill(&mut self) -> std::io::Result<()> {
        (**self).kill()
    }

    fn wait(&mut self) -> std::io::Result<ProcessExit> {
        (**self).wait()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reports alive for `alive_polls` checks, then exits with `code`.
    struct ScriptedHandle {
        alive_polls: usize,
        code: i32,
        polls: usize,
        killed: bool,
    }

    impl ScriptedHandle {
        fn new(alive_polls: usize, code: i32) -> Self {
            Self {
                alive_polls,
                code,
                polls: 0,
                killed: false,
            }
        }
    }

    impl ProcessHandle for ScriptedHandle {
        fn id(&self) -> u32 {
            0
        }

        fn try_exit(&mut self) -> std::io::Result<Option<ProcessExit>> {
            self.polls += 1;
            if self.killed || self.polls > self.alive_polls {
                return Ok(Some(ProcessExit {
                    code: Some(self.code),
                }));
            }
            Ok(None)
        }

        fn kill(&mut self) -> std::io::Result<()> {
            self.killed = true;
            Ok(())
        }

        fn wait(&mut self) -> std::io::Result<ProcessExit> {
            Ok(ProcessExit { code: None })
        }
    }

    struct BrokenHandle;

    impl ProcessHandle for BrokenHandle {
        fn id(&self) -> u32 {
            0
        }

        fn try_exit(&mut self) -> std::io::Result<Option<ProcessExit>> {
            Err(std::io::Error::other("waitpid failed"))
        }

        fn kill(&mut self) -> std::io::Result<()> {
            Ok(())
        }

        fn wait(&mut self) -> std::io::Result<ProcessExit> {
            Err(std::io::Error::other("waitpid failed"))
        }
    }

    #[test]
    fn fan_in_waits_for_slowest_handle() {
        let mut handles = vec![
            ScriptedHandle::new(0, 0),
            ScriptedHandle::new(5, 3),
            ScriptedHandle::new(2, 1),
        ];

        let states = wait_for_all(&mut handles, Duration::from_millis(1), None);

        assert_eq!(
            states,
            vec![
                ExitState::Exited {
                    exit: ProcessExit { code: Some(0) }
                },
                ExitState::Exited {
                    exit: ProcessExit { code: Some(3) }
                },
                ExitState::Exited {
                    exit: ProcessExit { code: Some(1) }
                },
            ]
        );
        // The slowest handle was observed alive five times before its exit.
        assert_eq!(handles[1].polls, 6);
        // Finished handles stop being polled.
        assert_eq!(handles[0].polls, 1);
    }

    #[test]
    fn fan_in_with_no_handles_returns_immediately() {
        let mut handles: Vec<ScriptedHandle> = Vec::new();
        let states = wait_for_all(&mut handles, Duration::from_secs(60), None);
        assert!(states.is_empty());
    }

    #[test]
    fn deadline_kills_stragglers_only() {
        let mut handles = vec![
            ScriptedHandle::new(0, 0),
            ScriptedHandle::new(usize::MAX, 0),
        ];

        let states = wait_for_all(
            &mut handles,
            Duration::from_millis(5),
            Some(Duration::from_millis(30)),
        );

        assert!(matches!(states[0], ExitState::Exited { .. }));
        assert_eq!(states[1], ExitState::TimedOut);
        assert!(!handles[0].killed);
        assert!(handles[1].killed);
    }

    /// Fails its first liveness check, then stays alive until killed.
    struct FlakyHandle {
        polls: usize,
        killed: bool,
        waited: bool,
    }

    impl ProcessHandle for FlakyHandle {
        fn id(&self) -> u32 {
            0
        }

        fn try_exit(&mut self) -> std::io::Result<Option<ProcessExit>> {
            self.polls += 1;
            if self.polls == 1 {
                return Err(std::io::Error::other("transient"));
            }
            Ok(self.killed.then_some(ProcessExit { code: None }))
        }

        fn kill(&mut self) -> std::io::Result<()> {
            self.killed = true;
            Ok(())
        }

        fn wait(&mut self) -> std::io::Result<ProcessExit> {
            self.waited = true;
            Ok(ProcessExit { code: None })
        }
    }

    #[test]
    fn failed_liveness_check_kills_and_reaps_before_returning() {
        let mut handles = vec![FlakyHandle {
            polls: 0,
            killed: false,
            waited: false,
        }];

        let states = wait_for_all(&mut handles, Duration::from_millis(1), None);

        assert!(matches!(&states[0], ExitState::Lost { reason } if reason == "transient"));
        assert!(handles[0].killed);
        assert!(handles[0].waited);
    }

    #[test]
    fn unreadable_liveness_is_reported_as_lost() {
        let mut handles = vec![BrokenHandle];
        let states = wait_for_all(&mut handles, Duration::from_millis(1), None);
        assert!(matches!(&states[0], ExitState::Lost { reason } if reason.contains("waitpid")));
    }

    #[test]
    fn single_wait_reports_exit_code() {
        let mut handle = ScriptedHandle::new(3, 7);
        let state = wait_for_exit(&mut handle, Duration::from_millis(1), None);
        assert_eq!(
            state,
            ExitState::Exited {
                exit: ProcessExit { code: Some(7) }
            }
        );
    }
}
