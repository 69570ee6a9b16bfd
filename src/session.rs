//! FIFO polling loop and the per-device sensor context.

use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::buffer::{GestureBuffer, QuadrantSample};
use crate::config::{Profile, SessionSettings, Thresholds};
use crate::error::GestureError;
use crate::gestures::{Direction, GestureClassifier};
use crate::port::{Delay, RegisterPort};
use crate::regs::{self, FIFO_CAPACITY, FIFO_RECORD_LEN};

/// Buffer and classifier for one `read_gesture` call.
#[derive(Debug)]
struct GestureSession {
    buffer: GestureBuffer,
    classifier: GestureClassifier,
}

impl GestureSession {
    fn new(th: Thresholds) -> Self {
        Self {
            buffer: GestureBuffer::new(),
            classifier: GestureClassifier::new(th),
        }
    }

    fn classify(&mut self) {
        // Mid-session decode only on a near/far event; swipes resolve in finish().
        if self.classifier.process_batch(self.buffer.snapshot()) {
            self.classifier.decode();
        }
        self.buffer.clear();
    }

    fn finish(&mut self) -> Direction {
        self.classifier.decode();
        let motion = self.classifier.motion();
        self.classifier.reset();
        self.buffer.clear();
        motion
    }
}

/// Exclusively owned handle to one physical gesture sensor.
pub struct GestureSensor<P, D> {
    port: P,
    delay: D,
    thresholds: Thresholds,
    settings: SessionSettings,
}

impl<P: RegisterPort, D: Delay> GestureSensor<P, D> {
    pub fn new(port: P, delay: D, profile: &Profile) -> Self {
        Self {
            port,
            delay,
            thresholds: profile.thresholds,
            settings: profile.session,
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Confirm the part on the bus is a supported gesture sensor.
    pub fn init(&mut self) -> Result<u8, GestureError> {
        let id = self.port.read_register(regs::ID)?;
        if !regs::DEVICE_IDS.contains(&id) {
            return Err(GestureError::UnknownDevice(id));
        }
        info!("gesture sensor id 0x{id:02X}");
        Ok(id)
    }

    pub fn enable_gesture_engine(&mut self) -> Result<(), GestureError> {
        let enable = self.port.read_register(regs::ENABLE)?;
        self.port.write_register(
            regs::ENABLE,
            enable | regs::ENABLE_PON | regs::ENABLE_PEN | regs::ENABLE_WEN | regs::ENABLE_GEN,
        )?;
        let gconf4 = self.port.read_register(regs::GCONF4)?;
        self.port
            .write_register(regs::GCONF4, gconf4 | regs::GCONF4_GMODE)?;
        info!("gesture engine enabled");
        Ok(())
    }

    pub fn disable_gesture_engine(&mut self) -> Result<(), GestureError> {
        let gconf4 = self.port.read_register(regs::GCONF4)?;
        self.port
            .write_register(regs::GCONF4, gconf4 & !regs::GCONF4_GMODE)?;
        let enable = self.port.read_register(regs::ENABLE)?;
        self.port
            .write_register(regs::ENABLE, enable & !regs::ENABLE_GEN)?;
        info!("gesture engine disabled");
        Ok(())
    }

    pub fn is_gesture_available(&mut self) -> Result<bool, GestureError> {
        let status = self.port.read_register(regs::GSTATUS)?;
        Ok(status & regs::GSTATUS_GVALID != 0)
    }

    fn gesture_mode_enabled(&mut self) -> Result<bool, GestureError> {
        let enable = self.port.read_register(regs::ENABLE)?;
        Ok(enable & regs::GESTURE_MODE_MASK == regs::GESTURE_MODE_MASK)
    }

    /// Poll the FIFO until the sensor drops GVALID, then return the decoded
    /// motion. Returns `Direction::None` without polling when no gesture is
    /// pending or the engine is off.
    pub fn read_gesture(&mut self, cancel: Option<&AtomicBool>) -> Result<Direction, GestureError> {
        if !self.is_gesture_available()? {
            debug!("no gesture pending");
            return Ok(Direction::None);
        }
        if !self.gesture_mode_enabled()? {
            warn!("gesture engine not powered/enabled");
            return Ok(Direction::None);
        }

        let mut session = GestureSession::new(self.thresholds);
        let pause = self.settings.poll_interval_ms;
        let max_polls = self.settings.max_polls();
        let mut polls = 0u64;

        loop {
            if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                return Err(GestureError::Cancelled);
            }
            if polls >= max_polls {
                return Err(GestureError::Timeout(self.settings.timeout_ms));
            }
            polls += 1;

            self.delay.delay_ms(pause);

            if !self.is_gesture_available()? {
                self.delay.delay_ms(pause);
                let motion = session.finish();
                info!("gesture: {}", motion.as_str());
                return Ok(motion);
            }

            if self.fetch_batch(&mut session.buffer)? > 0 {
                session.classify();
            }
        }
    }

    /// Drain the FIFO into `buffer`, returning the number of records appended.
    fn fetch_batch(&mut self, buffer: &mut GestureBuffer) -> Result<usize, GestureError> {
        let level = usize::from(self.port.read_register(regs::GFLVL)?);
        if level == 0 {
            return Ok(0);
        }
        if level > buffer.remaining() {
            return Err(GestureError::BufferOverflow {
                capacity: FIFO_CAPACITY,
            });
        }

        let requested = level * FIFO_RECORD_LEN;
        let mut raw = [0u8; FIFO_CAPACITY * FIFO_RECORD_LEN];
        let got = self.port.read_block(regs::GFIFO_U, &mut raw[..requested])?;
        if got != requested {
            return Err(GestureError::ShortRead { requested, got });
        }

        for rec in raw[..requested].chunks_exact(FIFO_RECORD_LEN) {
            let rec: [u8; FIFO_RECORD_LEN] = rec
                .try_into()
                .map_err(|_| GestureError::ShortRead { requested, got })?;
            buffer.push(QuadrantSample::from_record(&rec))?;
        }
        debug!("fifo: {level} records");
        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::{ReplayDevice, Trace};

    #[derive(Default)]
    struct CountingDelay {
        calls: u32,
    }

    impl Delay for CountingDelay {
        fn delay_ms(&mut self, _ms: u64) {
            self.calls += 1;
        }
    }

    fn sensor(json: &str) -> GestureSensor<ReplayDevice, CountingDelay> {
        let trace: Trace = serde_json::from_str(json).unwrap();
        GestureSensor::new(
            ReplayDevice::new(trace),
            CountingDelay::default(),
            &Profile::default(),
        )
    }

    const DOWN_SWIPE: &str =
        "[[50,11,30,30],[40,20,30,30],[30,30,30,30],[20,40,30,30],[11,50,30,30]]";
    const STILL: &str = "[[80,80,80,80],[80,80,80,80],[80,80,80,80],[80,80,80,80],[80,80,80,80]]";

    #[test]
    fn swipe_down_session() {
        let mut s = sensor(&format!(r#"{{"batches": [{DOWN_SWIPE}]}}"#));
        assert_eq!(s.read_gesture(None).unwrap(), Direction::Down);
        assert_eq!(s.port().remaining_batches(), 0);
        // one poll with data, one that sees GVALID clear, plus the closing pause
        assert_eq!(s.delay.calls, 3);
    }

    #[test]
    fn bundled_traces_decode() {
        let mut s = sensor(include_str!("../traces/swipe_down.json"));
        assert_eq!(s.read_gesture(None).unwrap(), Direction::Down);

        let mut s = sensor(include_str!("../traces/swipe_left.json"));
        assert_eq!(s.read_gesture(None).unwrap(), Direction::Left);
    }

    #[test]
    fn idle_sensor_yields_none_without_writes() {
        let mut s = sensor(r#"{"batches": []}"#);
        assert_eq!(s.read_gesture(None).unwrap(), Direction::None);
        assert!(s.port().writes().is_empty());
        assert_eq!(s.delay.calls, 0);
    }

    #[test]
    fn disabled_engine_yields_none() {
        // GVALID set, GEN clear
        let mut s = sensor(&format!(r#"{{"enable": 1, "batches": [{DOWN_SWIPE}]}}"#));
        assert_eq!(s.read_gesture(None).unwrap(), Direction::None);
        assert_eq!(s.port().remaining_batches(), 1);
    }

    #[test]
    fn near_session_then_fresh_session_starts_clean() {
        let drift_a = "[[40,40,40,40],[41,40,41,40],[42,40,42,40],[43,40,43,40],[44,40,44,40]]";
        let drift_b = "[[44,40,44,40],[43,40,43,40],[42,40,42,40],[41,40,41,40],[40,40,40,40]]";
        let mut batches = vec![drift_a.to_string(), drift_b.to_string()];
        batches.extend(std::iter::repeat_n(STILL.to_string(), 10));
        let json = format!(r#"{{"batches": [{}]}}"#, batches.join(","));

        let mut s = sensor(&json);
        assert_eq!(s.read_gesture(None).unwrap(), Direction::Near);

        // same device, no pending data: nothing carries over
        assert_eq!(s.read_gesture(None).unwrap(), Direction::None);
    }

    #[test]
    fn empty_fifo_fill_is_skipped() {
        let mut s = sensor(&format!(r#"{{"batches": [[], {DOWN_SWIPE}]}}"#));
        assert_eq!(s.read_gesture(None).unwrap(), Direction::Down);
    }

    #[test]
    fn stuck_sensor_times_out_after_poll_budget() {
        let trace: Trace = serde_json::from_str(r#"{"stuck": true}"#).unwrap();
        let mut profile = Profile::default();
        profile.session.poll_interval_ms = 30;
        profile.session.timeout_ms = 300;
        let mut s = GestureSensor::new(ReplayDevice::new(trace), CountingDelay::default(), &profile);
        let err = s.read_gesture(None).unwrap_err();
        assert!(matches!(err, GestureError::Timeout(300)));
        assert_eq!(s.delay.calls, 10);
    }

    #[test]
    fn session_ending_within_budget_is_not_a_timeout() {
        // 10-poll budget: one data poll plus the GVALID-clear poll fit
        let mut profile = Profile::default();
        profile.session.timeout_ms = 300;
        let trace: Trace =
            serde_json::from_str(&format!(r#"{{"batches": [{DOWN_SWIPE}]}}"#)).unwrap();
        let mut s = GestureSensor::new(ReplayDevice::new(trace), CountingDelay::default(), &profile);
        assert_eq!(s.read_gesture(None).unwrap(), Direction::Down);
    }

    #[test]
    fn cancellation_stops_the_loop() {
        let mut s = sensor(r#"{"stuck": true}"#);
        let cancel = AtomicBool::new(true);
        let err = s.read_gesture(Some(&cancel)).unwrap_err();
        assert!(matches!(err, GestureError::Cancelled));
    }

    #[test]
    fn short_fifo_read_is_fatal() {
        let mut s = sensor(&format!(r#"{{"batches": [{DOWN_SWIPE}]}}"#));
        s.port.short_reads();
        let err = s.read_gesture(None).unwrap_err();
        assert!(matches!(
            err,
            GestureError::ShortRead {
                requested: 20,
                got: 19
            }
        ));
    }

    #[test]
    fn bus_failure_is_propagated() {
        let mut s = sensor(&format!(r#"{{"batches": [{DOWN_SWIPE}]}}"#));
        s.port.fail_register(regs::GFLVL);
        assert!(matches!(s.read_gesture(None), Err(GestureError::Bus(_))));
    }

    #[test]
    fn oversized_fifo_level_is_rejected() {
        let records = vec!["[20,20,20,20]"; 33].join(",");
        let mut s = sensor(&format!(r#"{{"batches": [[{records}]]}}"#));
        assert!(matches!(
            s.read_gesture(None),
            Err(GestureError::BufferOverflow { capacity: 32 })
        ));
    }

    #[test]
    fn init_checks_device_id() {
        let mut s = sensor("{}");
        assert_eq!(s.init().unwrap(), 0xAB);

        let mut s = sensor(r#"{"device_id": 66}"#);
        assert!(matches!(s.init(), Err(GestureError::UnknownDevice(0x42))));
    }

    #[test]
    fn enable_and_disable_toggle_mode_bits() {
        let mut s = sensor(r#"{"enable": 0}"#);
        s.enable_gesture_engine().unwrap();
        assert!(s.gesture_mode_enabled().unwrap());
        let enable = s.port.read_register(regs::ENABLE).unwrap();
        let on = regs::ENABLE_PON | regs::ENABLE_PEN | regs::ENABLE_WEN | regs::ENABLE_GEN;
        assert_eq!(enable & on, on);
        assert_eq!(
            s.port.read_register(regs::GCONF4).unwrap() & regs::GCONF4_GMODE,
            regs::GCONF4_GMODE
        );

        s.disable_gesture_engine().unwrap();
        assert!(!s.gesture_mode_enabled().unwrap());
        assert_eq!(s.port.read_register(regs::GCONF4).unwrap() & regs::GCONF4_GMODE, 0);
    }
}
