/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Write};

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub(crate) struct SyncLogger {
    level: LevelFilter,
}

impl SyncLogger {
    pub(crate) fn new(verbose_level: u8) -> Self {
        let level = match verbose_level {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        SyncLogger { level }
    }

    pub(crate) fn into_global_logger(self) -> Result<(), SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }

    fn write_record<W: Write>(&self, io: &mut W, record: &Record) -> io::Result<()> {
        write!(io, "{} {}", Local::now().format(TIME_FORMAT), record.level())?;
        if self.level >= LevelFilter::Debug {
            write!(io, " [{}]", record.target())?;
        }
        writeln!(io, " {}", record.args())
    }
}

impl Log for SyncLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut stderr = io::stderr().lock();
        let _ = self.write_record(&mut stderr, record);
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}
