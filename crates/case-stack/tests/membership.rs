//! Property tests for the stack membership invariant.

use std::collections::HashSet;
use std::time::Duration;

use case_stack::{Case, CaseStack, CaseToken, action};
use proptest::prelude::*;
use strum::IntoEnumIterator;

#[derive(Clone, Debug)]
enum Op {
    Push(Case),
    PushFor(Case, u64),
    PushWith(Case),
    Pop(Case),
    DisposeOldest,
    Tick(u64),
}

fn case_strategy() -> impl Strategy<Value = Case> {
    let cases: Vec<Case> = Case::iter().filter(|c| !c.is_none()).collect();
    prop::sample::select(cases)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        case_strategy().prop_map(Op::Push),
        (case_strategy(), 1u64..200).prop_map(|(case, ms)| Op::PushFor(case, ms)),
        case_strategy().prop_map(Op::PushWith),
        case_strategy().prop_map(Op::Pop),
        Just(Op::DisposeOldest),
        (0u64..120).prop_map(Op::Tick),
    ]
}

fn assert_membership(stack: &CaseStack) -> Result<(), TestCaseError> {
    let order = stack.cases();
    let distinct: HashSet<Case> = order.iter().copied().collect();
    prop_assert_eq!(distinct.len(), order.len(), "duplicate case in {:?}", order);

    for case in Case::iter() {
        prop_assert_eq!(stack.has_case(case), distinct.contains(&case));
    }
    prop_assert_eq!(stack.current_case(), order.last().copied().unwrap_or(Case::None));
    Ok(())
}

proptest! {
    #[test]
    fn membership_mirrors_stack_order(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let stack = CaseStack::new();
        let mut tokens: Vec<CaseToken> = Vec::new();

        for op in ops {
            match op {
                Op::Push(case) => stack.push(case).unwrap(),
                Op::PushFor(case, ms) => stack.push_for(case, Duration::from_millis(ms)).unwrap(),
                Op::PushWith(case) => tokens.push(stack.push_with(case, action(|| Ok(()))).unwrap()),
                Op::Pop(case) => {
                    stack.pop_case(case);
                }
                Op::DisposeOldest => {
                    if !tokens.is_empty() {
                        tokens.remove(0).dispose();
                    }
                }
                Op::Tick(ms) => stack.tick(Duration::from_millis(ms)),
            }
            assert_membership(&stack)?;
        }
    }

    #[test]
    fn pop_preserves_relative_order(picks in prop::collection::vec(case_strategy(), 1..10), victim in case_strategy()) {
        let stack = CaseStack::new();
        for case in &picks {
            stack.push(*case).unwrap();
        }
        let mut expected = stack.cases();
        expected.retain(|c| *c != victim);

        stack.pop_case(victim);

        prop_assert_eq!(stack.cases(), expected);
    }
}
