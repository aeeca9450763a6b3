//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of Parlour.
//
// Parlour is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Parlour is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Parlour. If not, see <http://www.gnu.org/licenses/>.

pub mod auth;
pub mod codes;
pub mod command;
pub mod commands;
pub mod consumer;
pub mod engine;
pub mod extension;
pub mod line;
pub mod mail;
pub mod properties;
pub mod reply;
pub mod router;
pub mod session;
pub mod starttls;
pub mod state;
pub mod syntax;
pub mod transport;

#[cfg(test)]
mod test_support;
