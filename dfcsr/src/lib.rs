// dfcsr - A 2-D coherent synchrotron radiation wake engine
// Derived from sir_ddft (Copyright (C) 2021 Julian Jeggle, Raphael Wittkowski)

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! A time-stepping simulator of coherent synchrotron radiation (CSR) wakes
//! for a 2-D charged-particle bunch travelling through a beamline.
//!
//! Usage
//! -----
//! ```no_run
//! use dfcsr::config::Config;
//! use dfcsr::driver::StepDriver;
//! use dfcsr::partition::Partitioner;
//!
//! let yaml = std::fs::read_to_string("run.yaml").unwrap();
//! let config = Config::parse(&yaml).unwrap();
//! let mut driver = StepDriver::new(&config).unwrap();
//! let partitioner = Partitioner::single();
//! driver.run(&config, &partitioner, None).unwrap();
//! ```

pub mod beam;
pub mod config;
pub mod deposition;
pub mod driver;
pub mod errors;
pub mod history;
pub mod integrand;
pub mod lattice;
pub mod localizer;
pub mod partition;
pub mod quadrature;
pub mod io;
pub mod stats;
pub mod transport;
pub mod vecmath;

pub use config::Config;
pub use driver::StepDriver;
pub use errors::DfcsrError;
