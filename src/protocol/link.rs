// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Upstream command link supervision.
//!
//! Turns received link frames into the velocity command the chassis runs each tick:
//! - a malformed frame is replaced by [`LinkCommand::safe_default`]
//! - the command only passes while the host holds control (`ctrl_flag == 1`)
//! - with no frame for more than 100 ms the command is zero

use crate::control::timer::elapsed_us;
use crate::protocol::messages::{LinkCommand, LinkError, RobotStatus, VelocityCommand};
use crate::protocol::parser::{decode_frame, Parser};

use log::debug;

/// A link silent for longer than this is stale.
pub const STALE_AFTER_US: u32 = 100_000;

pub struct CommandLink {
    parser: Parser,
    latest: LinkCommand,
    received_at: Option<u32>,
    stale: bool,
}

impl Default for CommandLink {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandLink {
    pub const fn new() -> Self {
        Self {
            parser: Parser::new(),
            latest: LinkCommand::safe_default(),
            received_at: None,
            stale: false,
        }
    }

    /// Feed one received byte.
    pub fn push_byte(&mut self, byte: u8, now_us: u32) {
        if let Some(result) = self.parser.push(byte) {
            self.accept(result, now_us);
        }
    }

    /// Feed one complete received buffer.
    pub fn push_frame(&mut self, buf: &[u8], now_us: u32) {
        self.accept(decode_frame(buf), now_us);
    }

    fn accept(&mut self, result: Result<LinkCommand, LinkError>, now_us: u32) {
        self.latest = match result {
            Ok(cmd) => cmd,
            Err(e) => {
                debug!("link frame dropped: {:?}", e);
                LinkCommand::safe_default()
            }
        };
        self.received_at = Some(now_us);
        self.stale = false;
    }

    /// Latest decoded command, whether or not it is forwarded.
    #[inline]
    pub fn latest(&self) -> &LinkCommand {
        &self.latest
    }

    #[inline]
    pub fn status(&self) -> RobotStatus {
        self.latest.status
    }

    /// Whether a frame has arrived within the staleness window.
    pub fn is_fresh(&self, now_us: u32) -> bool {
        match self.received_at {
            Some(t) => elapsed_us(now_us, t) <= STALE_AFTER_US,
            None => false,
        }
    }

    /// Velocity command for this tick.
    pub fn command(&mut self, now_us: u32) -> VelocityCommand {
        if !self.is_fresh(now_us) {
            if self.received_at.is_some() && !self.stale {
                debug!("link stale, commanding zero velocity");
                self.stale = true;
            }
            return VelocityCommand::zero();
        }
        if self.latest.has_control() {
            self.latest.velocity()
        } else {
            VelocityCommand::zero()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{ChassisMode, COMMAND_FRAME_LEN};
    use crate::protocol::parser::encode_frame;

    fn frame(cmd: &LinkCommand) -> [u8; COMMAND_FRAME_LEN] {
        let mut out = [0u8; COMMAND_FRAME_LEN];
        encode_frame(&cmd.to_payload(), &mut out).unwrap();
        out
    }

    fn driving(ctrl_flag: u8) -> LinkCommand {
        LinkCommand {
            x: 1.0,
            y: 0.5,
            z: -0.25,
            mode: ChassisMode::LockX,
            ctrl_flag,
            ..LinkCommand::default()
        }
    }

    #[test]
    fn silent_link_commands_zero() {
        let mut link = CommandLink::new();
        assert_eq!(link.command(0), VelocityCommand::zero());
        assert_eq!(link.command(5_000_000), VelocityCommand::zero());
    }

    #[test]
    fn forwards_only_with_control() {
        let mut link = CommandLink::new();
        link.push_frame(&frame(&driving(1)), 1_000);
        let v = link.command(2_000);
        assert_eq!(v.linear.x, 1.0);
        assert_eq!(v.linear.y, 0.5);
        assert_eq!(v.angular.z, -0.25);
        assert_eq!(v.mode, ChassisMode::LockX);

        link.push_frame(&frame(&driving(0)), 3_000);
        assert_eq!(link.command(4_000), VelocityCommand::zero());
        assert_eq!(link.latest().x, 1.0);
    }

    #[test]
    fn goes_stale_after_100_ms() {
        let mut link = CommandLink::new();
        link.push_frame(&frame(&driving(1)), 0);
        assert_eq!(link.command(100_000).linear.x, 1.0);
        assert_eq!(link.command(100_001), VelocityCommand::zero());

        // A new frame revives it.
        link.push_frame(&frame(&driving(1)), 200_000);
        assert_eq!(link.command(250_000).linear.x, 1.0);
    }

    #[test]
    fn corrupt_frame_falls_back_to_safe_default() {
        let mut link = CommandLink::new();
        link.push_frame(&frame(&driving(1)), 0);
        let mut bad = frame(&driving(1));
        bad[6] ^= 0xFF;
        link.push_frame(&bad, 10_000);
        assert_eq!(*link.latest(), LinkCommand::safe_default());
        assert_eq!(link.command(11_000), VelocityCommand::zero());
    }

    #[test]
    fn byte_stream_feeds_the_same_path() {
        let mut link = CommandLink::new();
        for (i, &b) in frame(&driving(1)).iter().enumerate() {
            link.push_byte(b, i as u32 * 100);
        }
        assert_eq!(link.command(3_000).linear.y, 0.5);
    }
}
