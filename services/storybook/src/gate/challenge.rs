//! services/storybook/src/gate/challenge.rs
//!
//! Arithmetic challenges shown by the parental gate.

use rand::Rng;

/// The three operations a challenge can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Addition,
    Subtraction,
    Multiplication,
}

impl Operation {
    const ALL: [Operation; 3] = [
        Operation::Addition,
        Operation::Subtraction,
        Operation::Multiplication,
    ];

    pub fn symbol(self) -> char {
        match self {
            Operation::Addition => '+',
            Operation::Subtraction => '-',
            Operation::Multiplication => '×',
        }
    }

    pub fn apply(self, left: i32, right: i32) -> i32 {
        match self {
            Operation::Addition => left + right,
            Operation::Subtraction => left - right,
            Operation::Multiplication => left * right,
        }
    }
}

/// A question and its precomputed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub operation: Operation,
    pub left: i32,
    pub right: i32,
    pub question: String,
    pub correct_answer: i32,
}

impl Challenge {
    pub fn new(operation: Operation, left: i32, right: i32) -> Self {
        Self {
            operation,
            left,
            right,
            question: format!("{} {} {}", left, operation.symbol(), right),
            correct_answer: operation.apply(left, right),
        }
    }
}

/// Picks an operation uniformly and draws operands from its range:
/// addition `[1, 20] + [1, 20]`, subtraction `[10, 29] - [1, minuend]`,
/// multiplication `[1, 9] × [1, 9]`. Subtraction never goes negative.
pub fn generate_challenge<R: Rng>(rng: &mut R) -> Challenge {
    let operation = Operation::ALL[rng.gen_range(0..Operation::ALL.len())];
    match operation {
        Operation::Addition => Challenge::new(
            operation,
            rng.gen_range(1..=20),
            rng.gen_range(1..=20),
        ),
        Operation::Subtraction => {
            let minuend = rng.gen_range(10..=29);
            let subtrahend = rng.gen_range(1..=minuend);
            Challenge::new(operation, minuend, subtrahend)
        }
        Operation::Multiplication => {
            Challenge::new(operation, rng.gen_range(1..=9), rng.gen_range(1..=9))
        }
    }
}
