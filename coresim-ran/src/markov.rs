//! One-step Markov engine for UE behavior
//!
//! Each UE state owns an ordered transition row. A step draws one uniform
//! sample, walks the row accumulating probabilities and returns the first
//! transition whose cumulative sum exceeds the draw. Rows that sum to
//! slightly less than one fall back to staying in place.

use rand::Rng;

use coresim_common::types::{UeProcedure, UeState};

/// One weighted transition out of a state.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    /// Successor state
    pub to: UeState,
    /// Transition probability
    pub probability: f64,
    /// Procedure executed when the transition is taken
    pub procedure: UeProcedure,
}

const DEREGISTERED: &[Transition] = &[
    // ue turns on and registers
    Transition {
        to: UeState::Registered,
        probability: 0.90,
        procedure: UeProcedure::Registration,
    },
    // ue off or failed to register
    Transition {
        to: UeState::Deregistered,
        probability: 0.10,
        procedure: UeProcedure::NoProcedure,
    },
];

const REGISTERED: &[Transition] = &[
    // initial setup completed, signalling is active
    Transition {
        to: UeState::Attached,
        probability: 0.99,
        procedure: UeProcedure::Attach,
    },
    // attach pending
    Transition {
        to: UeState::Registered,
        probability: 0.005,
        procedure: UeProcedure::NoProcedure,
    },
    // attach failed, too many attempts or loss of connectivity
    Transition {
        to: UeState::Deregistered,
        probability: 0.005,
        procedure: UeProcedure::LossOfConnection,
    },
];

const ATTACHED: &[Transition] = &[
    // pdu session established
    Transition {
        to: UeState::Connected,
        probability: 0.90,
        procedure: UeProcedure::PduSessionEstablishment,
    },
    // pdu session establishment pending
    Transition {
        to: UeState::Attached,
        probability: 0.05,
        procedure: UeProcedure::NoProcedure,
    },
    Transition {
        to: UeState::Deregistered,
        probability: 0.05,
        procedure: UeProcedure::LossOfConnection,
    },
];

const IDLE: &[Transition] = &[
    Transition {
        to: UeState::Idle,
        probability: 0.94,
        procedure: UeProcedure::NoProcedure,
    },
    // network-initiated only; service request is driven by the traffic loop
    Transition {
        to: UeState::Connected,
        probability: 0.05,
        procedure: UeProcedure::Paging,
    },
    Transition {
        to: UeState::Handover,
        probability: 0.007,
        procedure: UeProcedure::HandoverInitiated,
    },
    Transition {
        to: UeState::Deregistered,
        probability: 0.003,
        procedure: UeProcedure::LossOfConnection,
    },
];

const CONNECTED: &[Transition] = &[
    Transition {
        to: UeState::Connected,
        probability: 0.997,
        procedure: UeProcedure::NoProcedure,
    },
    Transition {
        to: UeState::Handover,
        probability: 0.002,
        procedure: UeProcedure::HandoverInitiated,
    },
    Transition {
        to: UeState::Deregistered,
        probability: 0.001,
        procedure: UeProcedure::LossOfConnection,
    },
];

const HANDOVER: &[Transition] = &[
    Transition {
        to: UeState::Connected,
        probability: 0.99,
        procedure: UeProcedure::HandoverSuccessful,
    },
    Transition {
        to: UeState::Deregistered,
        probability: 0.01,
        procedure: UeProcedure::HandoverFailure,
    },
];

/// The transition row of one state.
pub fn transitions(state: UeState) -> &'static [Transition] {
    match state {
        UeState::Deregistered => DEREGISTERED,
        UeState::Registered => REGISTERED,
        UeState::Attached => ATTACHED,
        UeState::Idle => IDLE,
        UeState::Connected => CONNECTED,
        UeState::Handover => HANDOVER,
    }
}

/// Draws the next state and the procedure to execute.
pub fn next_state(rng: &mut impl Rng, current: UeState) -> (UeState, UeProcedure) {
    let draw: f64 = rng.gen();
    let mut cumulative = 0.0;
    for t in transitions(current) {
        cumulative += t.probability;
        if draw < cumulative {
            return (t.to, t.procedure);
        }
    }
    (current, UeProcedure::NoProcedure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const ALL_STATES: [UeState; 6] = [
        UeState::Deregistered,
        UeState::Registered,
        UeState::Attached,
        UeState::Idle,
        UeState::Connected,
        UeState::Handover,
    ];

    #[test]
    fn test_rows_sum_close_to_one() {
        for state in ALL_STATES {
            let sum: f64 = transitions(state).iter().map(|t| t.probability).sum();
            assert!(sum >= 0.999, "{state} row sums to {sum}");
            assert!(sum <= 1.0 + 1e-9, "{state} row sums to {sum}");
        }
    }

    #[test]
    fn test_next_returns_listed_transitions_only() {
        let mut rng = StdRng::seed_from_u64(7);
        for state in ALL_STATES {
            let row = transitions(state);
            for _ in 0..2000 {
                let (next, proc) = next_state(&mut rng, state);
                let listed = row.iter().any(|t| t.to == next && t.procedure == proc);
                let fallback = next == state && proc == UeProcedure::NoProcedure;
                assert!(listed || fallback, "{state} produced ({next}, {proc})");
            }
        }
    }

    #[test]
    fn test_deregistered_mostly_registers() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut registered = 0usize;
        let n = 10_000;
        for _ in 0..n {
            let (next, proc) = next_state(&mut rng, UeState::Deregistered);
            if next == UeState::Registered {
                assert_eq!(proc, UeProcedure::Registration);
                registered += 1;
            }
        }
        let fraction = registered as f64 / n as f64;
        assert!((fraction - 0.90).abs() < 0.02, "got {fraction}");
    }

    #[test]
    fn test_handover_resolution() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..2000 {
            let (next, proc) = next_state(&mut rng, UeState::Handover);
            match next {
                UeState::Connected => assert_eq!(proc, UeProcedure::HandoverSuccessful),
                UeState::Deregistered => assert_eq!(proc, UeProcedure::HandoverFailure),
                other => panic!("unexpected handover successor {other}"),
            }
        }
    }

    #[test]
    fn test_connected_is_sticky() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut stayed = 0usize;
        let n = 10_000;
        for _ in 0..n {
            if next_state(&mut rng, UeState::Connected).0 == UeState::Connected {
                stayed += 1;
            }
        }
        assert!(stayed as f64 / n as f64 > 0.99);
    }
}
