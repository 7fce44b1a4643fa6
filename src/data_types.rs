// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Element datatypes a data message's payload may be interpreted as

use std::fmt;

use crate::error::{Code, MpiError, MpiResult};

/// The closed set of payload element types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Single byte / character
    Char,
    /// Signed 32-bit integer
    Int,
    /// 8-byte floating point value
    Double,
}

impl DataType {
    /// Size of one element in bytes
    pub const fn size(&self) -> usize {
        match self {
            DataType::Char => 1,
            DataType::Int => 4,
            DataType::Double => 8,
        }
    }

    /// Numeric code carried in the data frame header
    pub const fn code(&self) -> u32 {
        match self {
            DataType::Char => 0,
            DataType::Int => 1,
            DataType::Double => 2,
        }
    }

    /// Decode a header datatype code
    pub fn from_code(code: u32) -> MpiResult<Self> {
        match code {
            0 => Ok(DataType::Char),
            1 => Ok(DataType::Int),
            2 => Ok(DataType::Double),
            other => Err(MpiError::new(
                Code::TypeError,
                format!("unrecognized datatype code {other}"),
            )),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Char => write!(f, "CHAR"),
            DataType::Int => write!(f, "INT"),
            DataType::Double => write!(f, "DOUBLE"),
        }
    }
}
