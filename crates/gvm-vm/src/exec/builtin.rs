//! Builtin methods and printing.

use gvm_runtime::objects::{self, closure, primitive, string, wait_group};
use gvm_runtime::{Addr, Tag};

use super::{pop_n, wake_all};
use crate::error::{Result, VmError};
use crate::process::{ChanResult, VmState};

fn expect_args(args: &[Addr], n: usize) -> Result<()> {
    if args.len() != n {
        return Err(VmError::ArityMismatch {
            expected: n,
            got: args.len(),
        });
    }
    Ok(())
}

/// Invoke a bound `Method` value.
pub(super) fn call_bound(state: &mut VmState, ctx: Addr, method: Addr, args: &[Addr]) -> Result<ChanResult> {
    let receiver = closure::method_receiver(&state.heap, method);
    let name = string::to_string(&state.heap, closure::method_name(&state.heap, method));
    dispatch(state, ctx, receiver, &name, args)
}

/// Run `method` on `receiver`, selected by the receiver's tag.
pub(super) fn dispatch(
    state: &mut VmState,
    ctx: Addr,
    receiver: Addr,
    method: &str,
    args: &[Addr],
) -> Result<ChanResult> {
    let heap = &mut state.heap;
    match (heap.tag(receiver), method) {
        (Tag::WaitGroup, "Add") => {
            expect_args(args, 1)?;
            let delta = primitive::expect_int(heap, args[0])?;
            Ok(wake_all(wait_group::add(heap, receiver, delta)?))
        }
        (Tag::WaitGroup, "Done") => {
            expect_args(args, 0)?;
            Ok(wake_all(wait_group::done(heap, receiver)?))
        }
        (Tag::WaitGroup, "Wait") => {
            expect_args(args, 0)?;
            if wait_group::wait(heap, receiver, ctx)? {
                log::debug!("context @{} waits on wait group @{}", ctx, receiver);
                Ok(ChanResult::Block)
            } else {
                Ok(ChanResult::Continue)
            }
        }
        (tag, _) => Err(VmError::UnknownMethod {
            receiver: tag,
            method: method.to_string(),
        }),
    }
}

/// `print` concatenates its operands; `println` separates them with spaces
/// and ends the line.
pub fn exec_print(state: &mut VmState, ctx: Addr, argc: usize, newline: bool) -> Result<()> {
    let vals = pop_n(state, ctx, argc)?;
    let parts: Vec<String> = vals.iter().map(|&v| objects::display(&state.heap, v)).collect();
    if newline {
        state.output.push_str(&parts.join(" "));
        state.output.push('\n');
    } else {
        state.output.push_str(&parts.concat());
    }
    Ok(())
}
