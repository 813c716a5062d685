//! Output ordering and exit codes under concurrent completion.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use api_ast::sequencer::Sequencer;

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn sequencer(max: i64) -> (Sequencer, SharedBuf, SharedBuf) {
    let out = SharedBuf::default();
    let err = SharedBuf::default();
    let seq = Sequencer::new(max, Box::new(out.clone()), Box::new(err.clone())).unwrap();
    (seq, out, err)
}

#[test]
fn output_follows_submission_order() {
    let (mut seq, out, _) = sequencer(100);
    // Later tasks finish first; their output must still come last.
    for (label, delay) in [("a", 30u64), ("b", 15), ("c", 0)] {
        seq.add(1, move |r| {
            thread::sleep(Duration::from_millis(delay));
            write!(r, "{label}")?;
            Ok(())
        });
    }
    assert_eq!(seq.get_exit_code(), 0);
    assert_eq!(out.contents(), "abc");
}

#[test]
fn reported_errors_set_exit_code() {
    let (mut seq, out, err) = sequencer(100);
    seq.add(1, |r| {
        write!(r, "before")?;
        Ok(())
    });
    seq.add_report(anyhow!("boom"));
    seq.add(1, |r| {
        write!(r, "after")?;
        Ok(())
    });
    assert_eq!(seq.get_exit_code(), 2);
    assert_eq!(out.contents(), "beforeafter");
    assert!(err.contents().contains("boom"));
}

#[test]
fn returned_errors_are_reported() {
    let (mut seq, _, err) = sequencer(100);
    seq.add(1, |_| Err(anyhow!("task failed")));
    assert_eq!(seq.get_exit_code(), 2);
    assert!(err.contents().contains("task failed"));
}

#[test]
fn oversized_weight_runs_exclusively() {
    let (mut seq, out, _) = sequencer(4);
    seq.add(1, |r| {
        thread::sleep(Duration::from_millis(20));
        write!(r, "x")?;
        Ok(())
    });
    // Negative and over-budget weights clamp to the whole budget, so these
    // cannot be admitted until everything before them has finished.
    seq.add(-1, |r| {
        write!(r, "y")?;
        Ok(())
    });
    seq.add(1 << 40, |r| {
        write!(r, "z")?;
        Ok(())
    });
    assert_eq!(seq.get_exit_code(), 0);
    assert_eq!(out.contents(), "xyz");
}

#[test]
fn exit_code_waits_for_all_tasks() {
    let (mut seq, out, _) = sequencer(100);
    for i in 0..32 {
        seq.add(1, move |r| {
            write!(r, "{} ", i)?;
            Ok(())
        });
    }
    assert_eq!(seq.get_exit_code(), 0);
    let got: Vec<usize> =
        out.contents().split_whitespace().map(|s| s.parse().unwrap()).collect();
    assert_eq!(got, (0..32).collect::<Vec<_>>());
}
