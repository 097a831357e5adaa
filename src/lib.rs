pub mod brainfuck;
pub mod error;
pub mod machine;

pub use brainfuck::{Inst, compile, compile_unoptimized, dump};
pub use error::{CompileError, Error, RuntimeError};
pub use machine::{Eof, Machine, State, run_with_state};

use std::ffi::CStr;
use std::io;
use std::os::raw::{c_char, c_int, c_uchar};

/// Compile and execute Brainfuck code on stdin/stdout through a
/// C-compatible interface.
///
/// Returns 0 on success, 1 on a compile error, 2 on a runtime error and -1
/// for a null pointer.
///
/// # Safety
/// `code` must be null or a valid null-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bfpeep_run(code: *const c_char, flush: c_uchar) -> c_int {
    if code.is_null() {
        return -1;
    }
    let code = unsafe { CStr::from_ptr(code) };
    let prog = match compile(code.to_bytes()) {
        Ok(prog) => prog,
        Err(e) => {
            tracing::error!("{e}");
            return 1;
        }
    };
    let mut machine = Machine::new();
    let mut input = io::stdin().lock();
    let mut output = io::stdout().lock();
    let result = if flush != 0 {
        machine.run::<true, _, _>(&prog, &mut input, &mut output)
    } else {
        machine.run::<false, _, _>(&prog, &mut input, &mut output)
    };
    match result {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("{e}");
            2
        }
    }
}

#[cfg(feature = "python")]
mod python {
    use pyo3::exceptions::{PyRuntimeError, PyValueError};
    use pyo3::prelude::*;
    use pyo3::types::PyBytes;

    use crate::{compile, run_with_state};

    /// Run `code` with `input` as stdin and return everything it printed.
    #[pyfunction]
    #[pyo3(signature = (code, input = None))]
    fn run<'py>(
        py: Python<'py>,
        code: &[u8],
        input: Option<&Bound<'py, PyBytes>>,
    ) -> PyResult<Bound<'py, PyBytes>> {
        let prog = compile(code).map_err(|e| PyValueError::new_err(e.to_string()))?;
        let input = input.map(|bytes| bytes.as_bytes()).unwrap_or_default();
        let state = run_with_state(&prog, input)
            .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
        Ok(PyBytes::new(py, &state.output))
    }

    /// The compiled instruction listing, one instruction per line.
    #[pyfunction]
    fn dump(code: &[u8]) -> PyResult<String> {
        let prog = compile(code).map_err(|e| PyValueError::new_err(e.to_string()))?;
        let mut out = Vec::new();
        crate::dump(&prog, &mut out).map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    #[pymodule]
    fn bfpeep(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(run, m)?)?;
        m.add_function(wrap_pyfunction!(dump, m)?)?;
        Ok(())
    }
}
