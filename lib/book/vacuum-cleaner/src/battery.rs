/*
 * Copyright (C) 2023 Asim Ihsan
 * SPDX-License-Identifier: AGPL-3.0-only
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU Affero General Public License as published by the Free
 * Software Foundation, version 3.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT ANY
 * WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A
 * PARTICULAR PURPOSE. See the GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License along
 * with this program. If not, see <https://www.gnu.org/licenses/>
 */

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

pub const DEFAULT_CAPACITY: u32 = 100;
pub const DEFAULT_DRAIN_RATE: u32 = 1;
pub const DEFAULT_CHARGE_RATE: u32 = 5;
pub const DEFAULT_CHARGE_THRESHOLD: u32 = 20;

/// Battery keeps `0 <= current <= capacity` after every operation. Once built, no operation can
/// fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Battery {
    capacity: u32,
    current: u32,
    drain_rate: u32,
    charge_rate: u32,
    total_consumed: u64,
    charge_cycles: u32,
}

impl Default for Battery {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            current: DEFAULT_CAPACITY,
            drain_rate: DEFAULT_DRAIN_RATE,
            charge_rate: DEFAULT_CHARGE_RATE,
            total_consumed: 0,
            charge_cycles: 0,
        }
    }
}

impl std::fmt::Display for Battery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Battery: {}/{} ({:.1}%)",
            self.current,
            self.capacity,
            self.percentage()
        )
    }
}

impl Battery {
    /// A full battery.
    pub fn new(capacity: u32, drain_rate: u32, charge_rate: u32) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if drain_rate == 0 {
            return Err(ConfigError::ZeroDrainRate);
        }
        if charge_rate == 0 {
            return Err(ConfigError::ZeroChargeRate);
        }
        Ok(Self {
            capacity,
            current: capacity,
            drain_rate,
            charge_rate,
            total_consumed: 0,
            charge_cycles: 0,
        })
    }

    /// Start at `level` instead of full.
    pub fn with_level(mut self, level: u32) -> Result<Self, ConfigError> {
        if level > self.capacity {
            return Err(ConfigError::InitialChargeExceedsCapacity {
                initial: level,
                capacity: self.capacity,
            });
        }
        self.current = level;
        Ok(self)
    }

    /// Drain one move's worth of power. Returns whether there is any power left.
    pub fn consume(&mut self) -> bool {
        self.consume_amount(self.drain_rate)
    }

    /// The level never drops below zero, but the full `amount` is still counted as consumed.
    pub fn consume_amount(&mut self, amount: u32) -> bool {
        self.current = self.current.saturating_sub(amount);
        self.total_consumed += u64::from(amount);
        self.current > 0
    }

    /// One charge step. A charge cycle is counted when this call is the one that tops the battery
    /// off, so charging an already full battery never counts.
    pub fn charge(&mut self) {
        let before = self.current;
        self.current = self.current.saturating_add(self.charge_rate).min(self.capacity);
        if before < self.capacity && self.current == self.capacity {
            self.charge_cycles += 1;
        }
    }

    pub fn needs_charging(&self, threshold: u32) -> bool {
        self.current <= threshold
    }

    pub fn is_empty(&self) -> bool {
        self.current == 0
    }

    pub fn percentage(&self) -> f64 {
        100.0 * f64::from(self.current) / f64::from(self.capacity)
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn drain_rate(&self) -> u32 {
        self.drain_rate
    }

    pub fn charge_rate(&self) -> u32 {
        self.charge_rate
    }

    pub fn total_consumed(&self) -> u64 {
        self.total_consumed
    }

    pub fn charge_cycles(&self) -> u32 {
        self.charge_cycles
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_new_battery_is_full() {
        let battery = Battery::new(100, 1, 5).unwrap();
        assert_eq!(battery.current(), 100);
        assert_eq!(battery, Battery::default());
        assert_abs_diff_eq!(battery.percentage(), 100.0);
    }

    #[test]
    fn test_zero_settings_are_rejected() {
        assert_eq!(Battery::new(0, 1, 5), Err(ConfigError::ZeroCapacity));
        assert_eq!(Battery::new(10, 0, 5), Err(ConfigError::ZeroDrainRate));
        assert_eq!(Battery::new(10, 1, 0), Err(ConfigError::ZeroChargeRate));
        assert_eq!(
            Battery::new(10, 1, 5).unwrap().with_level(11),
            Err(ConfigError::InitialChargeExceedsCapacity {
                initial: 11,
                capacity: 10
            })
        );
    }

    #[test]
    fn test_consume_floors_at_zero_but_counts_everything() {
        let mut battery = Battery::new(10, 4, 5).unwrap();
        assert!(battery.consume());
        assert!(battery.consume());
        assert_eq!(battery.current(), 2);
        assert!(!battery.consume());
        assert_eq!(battery.current(), 0);
        assert!(battery.is_empty());
        assert_eq!(battery.total_consumed(), 12);
    }

    #[test]
    fn test_charge_from_one_below_capacity_counts_one_cycle() {
        let mut battery = Battery::new(100, 1, 5).unwrap().with_level(99).unwrap();
        battery.charge();
        assert_eq!(battery.current(), 100);
        assert_eq!(battery.charge_cycles(), 1);
        battery.charge();
        battery.charge();
        assert_eq!(battery.current(), 100);
        assert_eq!(battery.charge_cycles(), 1);
    }

    #[test]
    fn test_partial_charge_does_not_count_a_cycle() {
        let mut battery = Battery::new(100, 1, 5).unwrap().with_level(50).unwrap();
        battery.charge();
        assert_eq!(battery.current(), 55);
        assert_eq!(battery.charge_cycles(), 0);
    }

    #[test]
    fn test_needs_charging_is_inclusive() {
        let battery = Battery::new(100, 1, 5).unwrap().with_level(20).unwrap();
        assert!(battery.needs_charging(DEFAULT_CHARGE_THRESHOLD));
        assert!(!battery.needs_charging(19));
    }

    #[test]
    fn test_display() {
        let battery = Battery::new(80, 1, 5).unwrap().with_level(20).unwrap();
        assert_eq!(format!("{}", battery), "Battery: 20/80 (25.0%)");
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Consume,
        ConsumeAmount(u32),
        Charge,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Consume),
            (0..50u32).prop_map(Op::ConsumeAmount),
            Just(Op::Charge),
        ]
    }

    proptest! {
        #[test]
        fn test_level_stays_within_capacity(
            capacity in 1..200u32,
            drain_rate in 1..20u32,
            charge_rate in 1..20u32,
            ops in prop::collection::vec(op(), 0..200),
        ) {
            let mut battery = Battery::new(capacity, drain_rate, charge_rate).unwrap();
            for op in ops {
                match op {
                    Op::Consume => { battery.consume(); }
                    Op::ConsumeAmount(amount) => { battery.consume_amount(amount); }
                    Op::Charge => battery.charge(),
                }
                prop_assert!(battery.current() <= battery.capacity());
            }
        }

        #[test]
        fn test_total_consumed_is_n_times_amount(
            amount in 0..30u32,
            n in 0..100u64,
        ) {
            let mut battery = Battery::new(50, 1, 5).unwrap();
            for _ in 0..n {
                battery.consume_amount(amount);
            }
            prop_assert_eq!(battery.total_consumed(), n * u64::from(amount));
        }
    }
}
