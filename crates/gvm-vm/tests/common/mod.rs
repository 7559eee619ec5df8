#![allow(dead_code)]

use gvm_vm::{Instruction, Process, ProcessConfig, VmError};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn run(code: Vec<Instruction>) -> Result<String, VmError> {
    run_with(code, ProcessConfig::new())
}

pub fn run_with(code: Vec<Instruction>, config: ProcessConfig) -> Result<String, VmError> {
    init_logger();
    Process::with_config(code, config)?.run()
}
