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

//! Argument syntax for the built-in commands.
//!
//! Command handlers receive the whole stripped line; these functions pick the
//! arguments they care about out of it.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RX_HELO: Regex = Regex::new("^([^ \t]+)").unwrap();
    static ref RX_MAIL: Regex =
        Regex::new("^(?i)FROM:[ ]?<([^>]*)>(.*)$").unwrap();
    static ref RX_MAIL_SIZE_PARM: Regex =
        Regex::new("^(?i)SIZE=([0-9]+)$").unwrap();
    static ref RX_RCPT: Regex =
        Regex::new("^(?i)TO:[ ]?<(?:@[^:]+:)?([^>]+)>(.*)$").unwrap();
    static ref RX_SASL_MECHANISM: Regex =
        Regex::new("^[A-Za-z0-9_-]{1,20}$").unwrap();
}

/// Everything after the verb of `line`, with surrounding whitespace removed.
pub fn arguments(line: &str) -> &str {
    let line = line.trim_start_matches(is_space);
    let end = line.find(is_space).unwrap_or(line.len());
    line[end..].trim_matches(is_space)
}

fn is_space(c: char) -> bool {
    ' ' == c || '\t' == c
}

/// Extracts the client's claimed host name from HELO/EHLO arguments.
pub fn helo_domain(args: &str) -> Option<&str> {
    RX_HELO
        .captures(args)
        .and_then(|cap| cap.get(1))
        .map(|c| c.as_str())
}

/// A parsed `MAIL FROM:<reverse-path> [parameters]` argument string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailFrom<'a> {
    /// The reverse path, without angle brackets. Empty for the null sender.
    pub reverse_path: &'a str,
    /// The raw ESMTP parameters, trimmed.
    pub parameters: &'a str,
    /// The value of the `SIZE` parameter, if given and well-formed.
    pub size: Option<u64>,
}

pub fn parse_mail_from(args: &str) -> Option<MailFrom<'_>> {
    let cap = RX_MAIL.captures(args)?;
    let reverse_path = cap.get(1)?.as_str();
    let parameters = cap.get(2).map_or("", |c| c.as_str()).trim();
    let size = parameters
        .split(' ')
        .filter_map(|parm| RX_MAIL_SIZE_PARM.captures(parm))
        .filter_map(|cap| cap.get(1))
        .filter_map(|c| c.as_str().parse::<u64>().ok())
        .next();

    Some(MailFrom {
        reverse_path,
        parameters,
        size,
    })
}

/// A parsed `RCPT TO:<forward-path> [parameters]` argument string.
///
/// Any source route is discarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RcptTo<'a> {
    pub forward_path: &'a str,
    pub parameters: &'a str,
}

pub fn parse_rcpt_to(args: &str) -> Option<RcptTo<'_>> {
    let cap = RX_RCPT.captures(args)?;
    Some(RcptTo {
        forward_path: cap.get(1)?.as_str(),
        parameters: cap.get(2).map_or("", |c| c.as_str()).trim(),
    })
}

/// Whether `name` is syntactically a SASL mechanism name (RFC 4422 §3.1).
pub fn is_sasl_mechanism_name(name: &str) -> bool {
    RX_SASL_MECHANISM.is_match(name)
}
