//! Decoder for the ASCII output of an optical tracking rig.
//!
//! Every datagram holds a handful of newline separated records. The only one
//! we care about is the 6-DOF record, which looks like this on the wire:
//!
//! ```text
//! 6d 2 [0 1.000][326.848 -187.216 109.503 -160.4704 -3.6963 -7.0913][0.940508 -0.339238 -0.019025 0.333599 0.932296 -0.139815 0.065170 0.125257 0.989982] [1 1.000][...]
//! ```
//!
//! The header (`6d` and a body count) and the bodies it announces are on the
//! same line. Bodies on any following line are not associated with the
//! header and are dropped. Every other record type (`fr`, `ts`, `3d`, ...)
//! is ignored.

use nom::{
    bytes::complete::tag,
    character::complete::{char, digit1, satisfy, u32},
    combinator::{map, map_res, opt, recognize},
    multi::separated_list1,
    sequence::{delimited, preceded, separated_pair, tuple},
    IResult,
};

/// One tracked rigid body, as reported by the rig.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyRecord {
    /// 0-based body identifier used on the wire
    pub id: u32,
    /// Tracking quality, unused
    pub quality: f64,
    /// Translation in millimeters, tracker axes
    pub translation: [f64; 3],
    /// Euler angles in degrees, unused
    pub rotation: [f64; 3],
}

/// A single line that carried a valid `6d` header.
#[derive(Debug, Clone, PartialEq)]
pub struct SixDofRecord {
    /// Number of bodies the header claimed. Not checked against `bodies`.
    pub declared: u32,
    /// Bodies found on the header's line, in the order they appeared
    pub bodies: Vec<BodyRecord>,
}

/// The decoded contents of one datagram.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingFrame {
    /// 6-DOF records with a positive body count, in line order
    pub records: Vec<SixDofRecord>,
}

impl TrackingFrame {
    /// Returns the body that a reader walking the frame line by line would
    /// have seen last for `wire_id`. Within a line only the first match
    /// counts, and a later line overrides an earlier one.
    pub fn latest_for(&self, wire_id: u32) -> Option<&BodyRecord> {
        self.records
            .iter()
            .filter_map(|record| record.bodies.iter().find(|body| body.id == wire_id))
            .last()
    }

    /// Iterates over every body in the frame.
    pub fn bodies(&self) -> impl Iterator<Item = &BodyRecord> {
        self.records.iter().flat_map(|record| record.bodies.iter())
    }
}

fn whitespace(s: &str) -> IResult<&str, char> {
    satisfy(char::is_whitespace)(s)
}

// Fixed point only: `-12.5` is fine, `12`, `+1.0` and `1e3` are not.
fn fixed_point(s: &str) -> IResult<&str, f64> {
    map_res(
        recognize(tuple((opt(char('-')), digit1, char('.'), digit1))),
        str::parse::<f64>,
    )(s)
}

fn bracketed_floats<const N: usize>(s: &str) -> IResult<&str, [f64; N]> {
    map_res(
        delimited(char('['), separated_list1(whitespace, fixed_point), char(']')),
        |values: Vec<f64>| <[f64; N]>::try_from(values),
    )(s)
}

fn parse_header(s: &str) -> IResult<&str, u32> {
    preceded(tuple((tag("6d"), whitespace)), u32)(s)
}

fn parse_body(s: &str) -> IResult<&str, BodyRecord> {
    map(
        tuple((
            delimited(char('['), separated_pair(u32, whitespace, fixed_point), char(']')),
            bracketed_floats::<6>,
            bracketed_floats::<9>,
        )),
        |((id, quality), pose, _matrix)| BodyRecord {
            id,
            quality,
            translation: [pose[0], pose[1], pose[2]],
            rotation: [pose[3], pose[4], pose[5]],
        },
    )(s)
}

/// Finds every well formed body anywhere in `line`, left to right, without
/// overlaps.
fn scan_bodies(line: &str) -> Vec<BodyRecord> {
    let mut bodies = Vec::new();
    let mut rest = line;

    while let Some(start) = rest.find('[') {
        match parse_body(&rest[start..]) {
            Ok((remaining, body)) => {
                bodies.push(body);
                rest = remaining;
            }
            Err(_) => rest = &rest[start + 1..],
        }
    }

    bodies
}

/// Decodes a single line. Returns `None` for anything that is not a `6d`
/// header announcing at least one body.
pub fn parse_record(line: &str) -> Option<SixDofRecord> {
    let (_rest, declared) = parse_header(line).ok()?;
    if declared == 0 {
        return None;
    }

    Some(SixDofRecord {
        declared,
        bodies: scan_bodies(line),
    })
}

/// Decodes the text of one datagram. Never fails; lines that do not decode
/// are skipped.
pub fn parse_frame(text: &str) -> TrackingFrame {
    TrackingFrame {
        records: text.split('\n').filter_map(parse_record).collect(),
    }
}
