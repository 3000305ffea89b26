//! Recording stand-in for [`CommandRunner`] used by unit tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::process::{CommandRunner, ExternalCommand};

type Handler = Box<dyn Fn(&ExternalCommand) -> io::Result<Option<i32>>>;

/// Dispatches on the program's file name. Programs without a handler succeed.
#[derive(Default)]
pub(crate) struct FakeRunner {
    handlers: HashMap<String, Handler>,
    calls: RefCell<Vec<ExternalCommand>>,
}

impl FakeRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on(
        mut self,
        program: &str,
        handler: impl Fn(&ExternalCommand) -> io::Result<Option<i32>> + 'static,
    ) -> Self {
        self.handlers.insert(program.to_string(), Box::new(handler));
        self
    }

    pub(crate) fn failing(self, program: &str, code: i32) -> Self {
        self.on(program, move |_| Ok(Some(code)))
    }

    /// Fakes that behave like a healthy toolchain checkout and build.
    ///
    /// `fetchlibs.sh` populates one architecture with one direct and one
    /// nested library.
    pub(crate) fn healthy(root: &Path) -> Self {
        let libs_root = root.to_path_buf();
        Self::new()
            .on("git", |cmd| {
                let dest = cmd.args.last().map(PathBuf::from).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "clone without destination")
                })?;
                fs::create_dir_all(cmd.cwd.join(dest))?;
                Ok(Some(0))
            })
            .on("patch", |_| Ok(Some(0)))
            .on("build.sh", |cmd| {
                touch(&cmd.cwd.join("afl-fuzz"))?;
                for arch in &cmd.args {
                    touch(&cmd.cwd.join("tracers").join(arch).join("afl-qemu-trace"))?;
                }
                Ok(Some(0))
            })
            .on("make", |cmd| {
                touch(&cmd.cwd.join("afl-fuzz"))?;
                Ok(Some(0))
            })
            .on("build_qemu_support.sh", |cmd| {
                let install = cmd.cwd.parent().unwrap_or(&cmd.cwd);
                touch(&install.join("tracers/i386/afl-qemu-trace"))?;
                Ok(Some(0))
            })
            .on("fetchlibs.sh", move |_| {
                let lib = libs_root.join("bin/fuzzer-libs/x86_64/lib");
                touch(&lib.join("ld-linux-x86-64.so.2"))?;
                touch(&lib.join("x86_64-linux-gnu/libc.so.6"))?;
                Ok(Some(0))
            })
    }

    pub(crate) fn calls(&self) -> Vec<ExternalCommand> {
        self.calls.borrow().clone()
    }

    pub(crate) fn programs(&self) -> Vec<String> {
        self.calls.borrow().iter().map(ExternalCommand::program_name).collect()
    }

    pub(crate) fn count(&self, program: &str) -> usize {
        self.programs().iter().filter(|p| p.as_str() == program).count()
    }
}

impl CommandRunner for FakeRunner {
    fn status(&self, command: &ExternalCommand) -> io::Result<Option<i32>> {
        self.calls.borrow_mut().push(command.clone());
        match self.handlers.get(&command.program_name()) {
            Some(handler) => handler(command),
            None => Ok(Some(0)),
        }
    }
}

pub(crate) fn touch(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, b"placeholder")
}
