//! Constructed (composite) value codec
//!
//! Constructed values are sequences of tagged elements inside `[N] { ... }`
//! context envelopes. This module provides the composite types the service
//! and object layers exchange: property values, read-access specifications,
//! lighting and color commands, calendar entries, action commands and
//! channel values, plus the enclosed-data-length scan used to find the byte
//! span of a constructed payload.

use crate::encoding::{
    decode_application_date, decode_application_time, decode_context_boolean,
    decode_context_enumerated, decode_context_object_id, decode_context_octet_string,
    decode_context_real, decode_context_unsigned, encode_application_date,
    encode_application_time, encode_closing_tag, encode_context_boolean,
    encode_context_enumerated, encode_context_object_id, encode_context_octet_string,
    encode_context_real, encode_context_unsigned, encode_opening_tag, Date, EncodingError,
    Result, Tag, TagClass, Time,
};
use crate::encoding::value::ApplicationDataValue;
use crate::object::{ObjectIdentifier, PropertyIdentifier};

#[cfg(not(feature = "std"))]
use alloc::{string::ToString, vec::Vec};

/// Byte span of the value enclosed by the opening tag at the front of `data`.
///
/// Walks tags forward keeping a nesting counter; the span excludes both the
/// opening and the matching closing tag.
pub fn enclosed_data_length(data: &[u8]) -> Result<usize> {
    let (open, open_len) = Tag::decode(data)?;
    if open.class != TagClass::Opening {
        return Err(EncodingError::InvalidTag);
    }
    let mut depth = 1usize;
    let mut pos = open_len;
    while pos < data.len() {
        let (tag, consumed) = Tag::decode(&data[pos..])?;
        match tag.class {
            TagClass::Opening => {
                depth += 1;
                pos += consumed;
            }
            TagClass::Closing => {
                depth -= 1;
                if depth == 0 {
                    return Ok(pos - open_len);
                }
                pos += consumed;
            }
            _ => {
                let value_len = tag.value_len();
                if data.len() < pos + consumed + value_len {
                    return Err(EncodingError::UnexpectedEndOfData);
                }
                pos += consumed + value_len;
            }
        }
    }
    Err(EncodingError::UnexpectedEndOfData)
}

fn next_is_context(data: &[u8], number: u8) -> bool {
    matches!(Tag::decode(data), Ok((tag, _)) if tag.is_context(number))
}

fn next_is_opening(data: &[u8], number: u8) -> bool {
    matches!(Tag::decode(data), Ok((tag, _)) if tag.is_opening(number))
}

fn next_is_closing(data: &[u8], number: u8) -> bool {
    matches!(Tag::decode(data), Ok((tag, _)) if tag.is_closing(number))
}

// ---------------------------------------------------------------------------
// BACnetPropertyValue
// ---------------------------------------------------------------------------

/// `BACnetPropertyValue ::= SEQUENCE { [0] id, [1] index?, [2] {value}, [3] priority? }`
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValue {
    pub property: PropertyIdentifier,
    pub array_index: Option<u32>,
    pub value: ApplicationDataValue,
    pub priority: Option<u8>,
}

impl PropertyValue {
    pub fn new(property: PropertyIdentifier, value: ApplicationDataValue) -> Self {
        Self {
            property,
            array_index: None,
            value,
            priority: None,
        }
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let start = buffer.len();
        encode_context_enumerated(buffer, 0, self.property.into())?;
        if let Some(index) = self.array_index {
            encode_context_unsigned(buffer, 1, index as u64)?;
        }
        encode_opening_tag(buffer, 2)?;
        self.value.encode(buffer)?;
        encode_closing_tag(buffer, 2)?;
        if let Some(priority) = self.priority {
            encode_context_unsigned(buffer, 3, priority as u64)?;
        }
        Ok(buffer.len() - start)
    }

    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let mut pos = 0;
        let (property, consumed) = decode_context_enumerated(&data[pos..], 0)?;
        pos += consumed;

        let array_index = if next_is_context(&data[pos..], 1) {
            let (index, consumed) = decode_context_unsigned(&data[pos..], 1)?;
            pos += consumed;
            Some(index as u32)
        } else {
            None
        };

        if !next_is_opening(&data[pos..], 2) {
            return Err(EncodingError::TagMismatch);
        }
        let inner_len = enclosed_data_length(&data[pos..])?;
        pos += 1;
        let (value, value_len) = ApplicationDataValue::decode(&data[pos..pos + inner_len])?;
        if value_len != inner_len {
            return Err(EncodingError::InvalidFormat(
                "trailing bytes in property value".to_string(),
            ));
        }
        pos += inner_len + 1;

        let priority = if pos < data.len() && next_is_context(&data[pos..], 3) {
            let (priority, consumed) = decode_context_unsigned(&data[pos..], 3)?;
            pos += consumed;
            Some(priority as u8)
        } else {
            None
        };

        Ok((
            Self {
                property: PropertyIdentifier::from(property),
                array_index,
                value,
                priority,
            },
            pos,
        ))
    }
}

// ---------------------------------------------------------------------------
// ReadAccessSpecification (ReadPropertyMultiple request element)
// ---------------------------------------------------------------------------

/// One property reference inside a read-access specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyReference {
    pub property: PropertyIdentifier,
    pub array_index: Option<u32>,
}

impl PropertyReference {
    pub fn new(property: PropertyIdentifier) -> Self {
        Self {
            property,
            array_index: None,
        }
    }

    pub fn with_array_index(property: PropertyIdentifier, array_index: u32) -> Self {
        Self {
            property,
            array_index: Some(array_index),
        }
    }
}

/// `ReadAccessSpecification ::= SEQUENCE { [0] object-id, [1] {property-references} }`
#[derive(Debug, Clone, PartialEq)]
pub struct ReadAccessSpecification {
    pub object_id: ObjectIdentifier,
    pub properties: Vec<PropertyReference>,
}

impl ReadAccessSpecification {
    pub fn new(object_id: ObjectIdentifier) -> Self {
        Self {
            object_id,
            properties: Vec::new(),
        }
    }

    pub fn add_property(&mut self, reference: PropertyReference) {
        self.properties.push(reference);
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let start = buffer.len();
        encode_context_object_id(
            buffer,
            0,
            self.object_id.object_type.into(),
            self.object_id.instance,
        )?;
        encode_opening_tag(buffer, 1)?;
        for reference in &self.properties {
            encode_context_enumerated(buffer, 0, reference.property.into())?;
            if let Some(index) = reference.array_index {
                encode_context_unsigned(buffer, 1, index as u64)?;
            }
        }
        encode_closing_tag(buffer, 1)?;
        Ok(buffer.len() - start)
    }

    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let mut pos = 0;
        let ((object_type, instance), consumed) = decode_context_object_id(&data[pos..], 0)?;
        pos += consumed;

        if !next_is_opening(&data[pos..], 1) {
            return Err(EncodingError::TagMismatch);
        }
        pos += 1;

        let mut properties = Vec::new();
        while !next_is_closing(&data[pos..], 1) {
            let (property, consumed) = decode_context_enumerated(&data[pos..], 0)?;
            pos += consumed;
            let array_index = if next_is_context(&data[pos..], 1) {
                let (index, consumed) = decode_context_unsigned(&data[pos..], 1)?;
                pos += consumed;
                Some(index as u32)
            } else {
                None
            };
            properties.push(PropertyReference {
                property: PropertyIdentifier::from(property),
                array_index,
            });
        }
        pos += 1;

        Ok((
            Self {
                object_id: ObjectIdentifier::from_parts(object_type, instance),
                properties,
            },
            pos,
        ))
    }
}

// ---------------------------------------------------------------------------
// BACnetxyColor
// ---------------------------------------------------------------------------

/// CIE xy chromaticity pair, both coordinates 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct XyColor {
    pub x: f32,
    pub y: f32,
}

impl XyColor {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_valid(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let mut written = crate::encoding::encode_application_real(buffer, self.x)?;
        written += crate::encoding::encode_application_real(buffer, self.y)?;
        Ok(written)
    }

    pub fn context_encode(&self, buffer: &mut Vec<u8>, number: u8) -> Result<usize> {
        let start = buffer.len();
        encode_opening_tag(buffer, number)?;
        self.encode(buffer)?;
        encode_closing_tag(buffer, number)?;
        Ok(buffer.len() - start)
    }

    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let (x, consumed_x) = crate::encoding::decode_application_real(data)?;
        let (y, consumed_y) = crate::encoding::decode_application_real(&data[consumed_x..])?;
        Ok((Self { x, y }, consumed_x + consumed_y))
    }

    pub fn context_decode(data: &[u8], number: u8) -> Result<(Self, usize)> {
        if !next_is_opening(data, number) {
            return Err(EncodingError::TagMismatch);
        }
        let inner_len = enclosed_data_length(data)?;
        let (value, consumed) = Self::decode(&data[1..1 + inner_len])?;
        if consumed != inner_len {
            return Err(EncodingError::InvalidFormat(
                "trailing bytes in xy-color".to_string(),
            ));
        }
        Ok((value, inner_len + 2))
    }
}

// ---------------------------------------------------------------------------
// BACnetLightingCommand
// ---------------------------------------------------------------------------

/// Lighting operations carried by a lighting command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LightingOperation {
    None = 0,
    FadeTo = 1,
    RampTo = 2,
    StepUp = 3,
    StepDown = 4,
    StepOn = 5,
    StepOff = 6,
    Warn = 7,
    WarnOff = 8,
    WarnRelinquish = 9,
    Stop = 10,
}

impl TryFrom<u32> for LightingOperation {
    type Error = EncodingError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(LightingOperation::None),
            1 => Ok(LightingOperation::FadeTo),
            2 => Ok(LightingOperation::RampTo),
            3 => Ok(LightingOperation::StepUp),
            4 => Ok(LightingOperation::StepDown),
            5 => Ok(LightingOperation::StepOn),
            6 => Ok(LightingOperation::StepOff),
            7 => Ok(LightingOperation::Warn),
            8 => Ok(LightingOperation::WarnOff),
            9 => Ok(LightingOperation::WarnRelinquish),
            10 => Ok(LightingOperation::Stop),
            _ => Err(EncodingError::ValueOutOfRange),
        }
    }
}

pub const LIGHTING_FADE_TIME_MIN: u32 = 100;
pub const LIGHTING_FADE_TIME_MAX: u32 = 86_400_000;

/// `BACnetLightingCommand ::= SEQUENCE { [0] operation, [1] target-level?,
/// [2] ramp-rate?, [3] step-increment?, [4] fade-time?, [5] priority? }`
///
/// Which optional fields are present depends on the operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingCommand {
    pub operation: LightingOperation,
    pub target_level: Option<f32>,
    pub ramp_rate: Option<f32>,
    pub step_increment: Option<f32>,
    pub fade_time: Option<u32>,
    pub priority: Option<u8>,
}

impl LightingCommand {
    pub fn new(operation: LightingOperation) -> Self {
        Self {
            operation,
            target_level: None,
            ramp_rate: None,
            step_increment: None,
            fade_time: None,
            priority: None,
        }
    }

    pub fn fade_to(level: f32, fade_time: Option<u32>) -> Self {
        Self {
            operation: LightingOperation::FadeTo,
            target_level: Some(level),
            ramp_rate: None,
            step_increment: None,
            fade_time,
            priority: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(level) = self.target_level {
            if !(0.0..=100.0).contains(&level) {
                return Err(EncodingError::ValueOutOfRange);
            }
        }
        if let Some(rate) = self.ramp_rate {
            if !(0.1..=100.0).contains(&rate) {
                return Err(EncodingError::ValueOutOfRange);
            }
        }
        if let Some(step) = self.step_increment {
            if !(0.1..=100.0).contains(&step) {
                return Err(EncodingError::ValueOutOfRange);
            }
        }
        if let Some(fade) = self.fade_time {
            if !(LIGHTING_FADE_TIME_MIN..=LIGHTING_FADE_TIME_MAX).contains(&fade) {
                return Err(EncodingError::ValueOutOfRange);
            }
        }
        if let Some(priority) = self.priority {
            if !(1..=16).contains(&priority) {
                return Err(EncodingError::ValueOutOfRange);
            }
        }
        Ok(())
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        self.validate()?;
        let start = buffer.len();
        encode_context_enumerated(buffer, 0, self.operation as u32)?;
        if let Some(level) = self.target_level {
            encode_context_real(buffer, 1, level)?;
        }
        if let Some(rate) = self.ramp_rate {
            encode_context_real(buffer, 2, rate)?;
        }
        if let Some(step) = self.step_increment {
            encode_context_real(buffer, 3, step)?;
        }
        if let Some(fade) = self.fade_time {
            encode_context_unsigned(buffer, 4, fade as u64)?;
        }
        if let Some(priority) = self.priority {
            encode_context_unsigned(buffer, 5, priority as u64)?;
        }
        Ok(buffer.len() - start)
    }

    pub fn context_encode(&self, buffer: &mut Vec<u8>, number: u8) -> Result<usize> {
        let start = buffer.len();
        encode_opening_tag(buffer, number)?;
        self.encode(buffer)?;
        encode_closing_tag(buffer, number)?;
        Ok(buffer.len() - start)
    }

    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let mut pos = 0;
        let (raw_op, consumed) = decode_context_enumerated(&data[pos..], 0)?;
        pos += consumed;
        let mut command = Self::new(LightingOperation::try_from(raw_op)?);

        while pos < data.len() {
            let (tag, _) = Tag::decode(&data[pos..])?;
            if tag.class != TagClass::Context {
                break;
            }
            match tag.number {
                1 => {
                    let (level, consumed) = decode_context_real(&data[pos..], 1)?;
                    command.target_level = Some(level);
                    pos += consumed;
                }
                2 => {
                    let (rate, consumed) = decode_context_real(&data[pos..], 2)?;
                    command.ramp_rate = Some(rate);
                    pos += consumed;
                }
                3 => {
                    let (step, consumed) = decode_context_real(&data[pos..], 3)?;
                    command.step_increment = Some(step);
                    pos += consumed;
                }
                4 => {
                    let (fade, consumed) = decode_context_unsigned(&data[pos..], 4)?;
                    command.fade_time = Some(fade as u32);
                    pos += consumed;
                }
                5 => {
                    let (priority, consumed) = decode_context_unsigned(&data[pos..], 5)?;
                    command.priority = Some(priority as u8);
                    pos += consumed;
                }
                _ => break,
            }
        }
        command.validate()?;
        Ok((command, pos))
    }
}

// ---------------------------------------------------------------------------
// BACnetColorCommand
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColorOperation {
    None = 0,
    FadeToColor = 1,
    FadeToCct = 2,
    RampToCct = 3,
    StepUpCct = 4,
    StepDownCct = 5,
    Stop = 6,
}

impl TryFrom<u32> for ColorOperation {
    type Error = EncodingError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(ColorOperation::None),
            1 => Ok(ColorOperation::FadeToColor),
            2 => Ok(ColorOperation::FadeToCct),
            3 => Ok(ColorOperation::RampToCct),
            4 => Ok(ColorOperation::StepUpCct),
            5 => Ok(ColorOperation::StepDownCct),
            6 => Ok(ColorOperation::Stop),
            _ => Err(EncodingError::ValueOutOfRange),
        }
    }
}

pub const COLOR_FADE_TIME_MIN: u32 = 100;
pub const COLOR_FADE_TIME_MAX: u32 = 86_400_000;
pub const COLOR_RAMP_RATE_MIN: u16 = 1;
pub const COLOR_RAMP_RATE_MAX: u16 = 30_000;
pub const COLOR_STEP_INCREMENT_MIN: u16 = 1;
pub const COLOR_STEP_INCREMENT_MAX: u16 = 30_000;
pub const COLOR_TEMPERATURE_MIN: u16 = 1000;
pub const COLOR_TEMPERATURE_MAX: u16 = 30_000;

/// `BACnetColorCommand ::= SEQUENCE { [0] operation, target/transit fields
/// selected by the operation }`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorCommand {
    pub operation: ColorOperation,
    pub target_color: Option<XyColor>,
    pub target_color_temperature: Option<u16>,
    pub fade_time: Option<u32>,
    pub ramp_rate: Option<u16>,
    pub step_increment: Option<u16>,
}

impl ColorCommand {
    pub fn new(operation: ColorOperation) -> Self {
        Self {
            operation,
            target_color: None,
            target_color_temperature: None,
            fade_time: None,
            ramp_rate: None,
            step_increment: None,
        }
    }

    pub fn fade_to_color(color: XyColor, fade_time: Option<u32>) -> Self {
        Self {
            target_color: Some(color),
            fade_time,
            ..Self::new(ColorOperation::FadeToColor)
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(fade) = self.fade_time {
            if !(COLOR_FADE_TIME_MIN..=COLOR_FADE_TIME_MAX).contains(&fade) {
                return Err(EncodingError::ValueOutOfRange);
            }
        }
        if let Some(rate) = self.ramp_rate {
            if !(COLOR_RAMP_RATE_MIN..=COLOR_RAMP_RATE_MAX).contains(&rate) {
                return Err(EncodingError::ValueOutOfRange);
            }
        }
        if let Some(step) = self.step_increment {
            if !(COLOR_STEP_INCREMENT_MIN..=COLOR_STEP_INCREMENT_MAX).contains(&step) {
                return Err(EncodingError::ValueOutOfRange);
            }
        }
        if let Some(cct) = self.target_color_temperature {
            if !(COLOR_TEMPERATURE_MIN..=COLOR_TEMPERATURE_MAX).contains(&cct) {
                return Err(EncodingError::ValueOutOfRange);
            }
        }
        Ok(())
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        self.validate()?;
        let start = buffer.len();
        encode_context_enumerated(buffer, 0, self.operation as u32)?;
        match self.operation {
            ColorOperation::FadeToColor => {
                let color = self.target_color.ok_or(EncodingError::ValueOutOfRange)?;
                color.context_encode(buffer, 1)?;
                if let Some(fade) = self.fade_time {
                    encode_context_unsigned(buffer, 3, fade as u64)?;
                }
            }
            ColorOperation::FadeToCct => {
                let cct = self
                    .target_color_temperature
                    .ok_or(EncodingError::ValueOutOfRange)?;
                encode_context_unsigned(buffer, 2, cct as u64)?;
                if let Some(fade) = self.fade_time {
                    encode_context_unsigned(buffer, 3, fade as u64)?;
                }
            }
            ColorOperation::RampToCct => {
                let cct = self
                    .target_color_temperature
                    .ok_or(EncodingError::ValueOutOfRange)?;
                encode_context_unsigned(buffer, 2, cct as u64)?;
                if let Some(rate) = self.ramp_rate {
                    encode_context_unsigned(buffer, 4, rate as u64)?;
                }
            }
            ColorOperation::StepUpCct | ColorOperation::StepDownCct => {
                if let Some(step) = self.step_increment {
                    encode_context_unsigned(buffer, 5, step as u64)?;
                }
            }
            ColorOperation::None | ColorOperation::Stop => {}
        }
        Ok(buffer.len() - start)
    }

    pub fn context_encode(&self, buffer: &mut Vec<u8>, number: u8) -> Result<usize> {
        let start = buffer.len();
        encode_opening_tag(buffer, number)?;
        self.encode(buffer)?;
        encode_closing_tag(buffer, number)?;
        Ok(buffer.len() - start)
    }

    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let mut pos = 0;
        let (raw_op, consumed) = decode_context_enumerated(&data[pos..], 0)?;
        pos += consumed;
        let mut command = Self::new(ColorOperation::try_from(raw_op)?);

        while pos < data.len() {
            let (tag, _) = Tag::decode(&data[pos..])?;
            match (tag.class, tag.number) {
                (TagClass::Opening, 1) => {
                    let (color, consumed) = XyColor::context_decode(&data[pos..], 1)?;
                    command.target_color = Some(color);
                    pos += consumed;
                }
                (TagClass::Context, 2) => {
                    let (cct, consumed) = decode_context_unsigned(&data[pos..], 2)?;
                    command.target_color_temperature = Some(cct as u16);
                    pos += consumed;
                }
                (TagClass::Context, 3) => {
                    let (fade, consumed) = decode_context_unsigned(&data[pos..], 3)?;
                    command.fade_time = Some(fade as u32);
                    pos += consumed;
                }
                (TagClass::Context, 4) => {
                    let (rate, consumed) = decode_context_unsigned(&data[pos..], 4)?;
                    command.ramp_rate = Some(rate as u16);
                    pos += consumed;
                }
                (TagClass::Context, 5) => {
                    let (step, consumed) = decode_context_unsigned(&data[pos..], 5)?;
                    command.step_increment = Some(step as u16);
                    pos += consumed;
                }
                _ => break,
            }
        }
        command.validate()?;
        Ok((command, pos))
    }
}

// ---------------------------------------------------------------------------
// BACnetCalendarEntry
// ---------------------------------------------------------------------------

/// Inclusive date range; a bound with wildcards leaves that side open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Date,
    pub end: Date,
}

fn date_ordinal(date: &Date) -> Option<u32> {
    if date.year == Date::UNSPECIFIED_YEAR
        || date.month == 0
        || date.month > 12
        || date.day == 0
        || date.day > 31
    {
        return None;
    }
    Some((date.year as u32) * 372 + (date.month as u32) * 31 + date.day as u32)
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: &Date) -> bool {
        let Some(ordinal) = date_ordinal(date) else {
            return false;
        };
        if let Some(start) = date_ordinal(&self.start) {
            if ordinal < start {
                return false;
            }
        }
        if let Some(end) = date_ordinal(&self.end) {
            if ordinal > end {
                return false;
            }
        }
        true
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let mut written = encode_application_date(buffer, &self.start)?;
        written += encode_application_date(buffer, &self.end)?;
        Ok(written)
    }

    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let (start, consumed_start) = decode_application_date(data)?;
        let (end, consumed_end) = decode_application_date(&data[consumed_start..])?;
        Ok((Self { start, end }, consumed_start + consumed_end))
    }
}

/// Month/week-of-month/day-of-week pattern, each field 0xFF for "any".
///
/// Weeks 1..=5 select the day ranges 1-7, 8-14, 15-21, 22-28 and 29-31;
/// week 6 selects the last seven days of the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekNDay {
    pub month: u8,
    pub week_of_month: u8,
    pub day_of_week: u8,
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
            if leap {
                29
            } else {
                28
            }
        }
        _ => 31,
    }
}

impl WeekNDay {
    pub fn matches(&self, date: &Date) -> bool {
        let month_ok = match self.month {
            Date::WILDCARD => true,
            Date::MONTH_ODD => date.month % 2 == 1,
            Date::MONTH_EVEN => date.month % 2 == 0,
            m => m == date.month,
        };
        if !month_ok {
            return false;
        }
        let week_ok = match self.week_of_month {
            Date::WILDCARD => true,
            week @ 1..=5 => date.day >= 1 && (date.day - 1) / 7 + 1 == week,
            6 => {
                let last = days_in_month(date.year, date.month);
                date.day + 7 > last
            }
            _ => false,
        };
        if !week_ok {
            return false;
        }
        self.day_of_week == Date::WILDCARD || self.day_of_week == date.weekday
    }
}

/// `BACnetCalendarEntry ::= CHOICE { [0] Date, [1] DateRange, [2] WeekNDay }`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalendarEntry {
    Date(Date),
    DateRange(DateRange),
    WeekNDay(WeekNDay),
}

impl CalendarEntry {
    /// Whether the entry covers the given concrete date.
    pub fn matches(&self, date: &Date) -> bool {
        match self {
            CalendarEntry::Date(pattern) => pattern.matches(date),
            CalendarEntry::DateRange(range) => range.contains(date),
            CalendarEntry::WeekNDay(pattern) => pattern.matches(date),
        }
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let start = buffer.len();
        match self {
            CalendarEntry::Date(date) => {
                crate::encoding::encode_context_date(buffer, 0, date)?;
            }
            CalendarEntry::DateRange(range) => {
                encode_opening_tag(buffer, 1)?;
                range.encode(buffer)?;
                encode_closing_tag(buffer, 1)?;
            }
            CalendarEntry::WeekNDay(pattern) => {
                encode_context_octet_string(
                    buffer,
                    2,
                    &[pattern.month, pattern.week_of_month, pattern.day_of_week],
                )?;
            }
        }
        Ok(buffer.len() - start)
    }

    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let (tag, _) = Tag::decode(data)?;
        match (tag.class, tag.number) {
            (TagClass::Context, 0) => {
                let (date, consumed) = crate::encoding::decode_context_date(data, 0)?;
                Ok((CalendarEntry::Date(date), consumed))
            }
            (TagClass::Opening, 1) => {
                let inner_len = enclosed_data_length(data)?;
                let (range, consumed) = DateRange::decode(&data[1..1 + inner_len])?;
                if consumed != inner_len {
                    return Err(EncodingError::InvalidFormat(
                        "trailing bytes in date range".to_string(),
                    ));
                }
                Ok((CalendarEntry::DateRange(range), inner_len + 2))
            }
            (TagClass::Context, 2) => {
                let (bytes, consumed) = decode_context_octet_string(data, 2)?;
                if bytes.len() != 3 {
                    return Err(EncodingError::InvalidLength);
                }
                Ok((
                    CalendarEntry::WeekNDay(WeekNDay {
                        month: bytes[0],
                        week_of_month: bytes[1],
                        day_of_week: bytes[2],
                    }),
                    consumed,
                ))
            }
            _ => Err(EncodingError::InvalidTag),
        }
    }
}

// ---------------------------------------------------------------------------
// BACnetActionCommand
// ---------------------------------------------------------------------------

/// One entry of a Command object's action list.
///
/// `[0] device-id?, [1] object-id, [2] property, [3] array-index?,
/// [4] {value}, [5] priority?, [6] post-delay?, [7] quit-on-failure,
/// [8] write-successful`
#[derive(Debug, Clone, PartialEq)]
pub struct ActionCommand {
    pub device_id: Option<ObjectIdentifier>,
    pub object_id: ObjectIdentifier,
    pub property: PropertyIdentifier,
    pub array_index: Option<u32>,
    pub value: ApplicationDataValue,
    pub priority: Option<u8>,
    pub post_delay: Option<u32>,
    pub quit_on_failure: bool,
    pub write_successful: bool,
}

impl ActionCommand {
    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let start = buffer.len();
        if let Some(device_id) = self.device_id {
            encode_context_object_id(buffer, 0, device_id.object_type.into(), device_id.instance)?;
        }
        encode_context_object_id(
            buffer,
            1,
            self.object_id.object_type.into(),
            self.object_id.instance,
        )?;
        encode_context_enumerated(buffer, 2, self.property.into())?;
        if let Some(index) = self.array_index {
            encode_context_unsigned(buffer, 3, index as u64)?;
        }
        encode_opening_tag(buffer, 4)?;
        self.value.encode(buffer)?;
        encode_closing_tag(buffer, 4)?;
        if let Some(priority) = self.priority {
            encode_context_unsigned(buffer, 5, priority as u64)?;
        }
        if let Some(delay) = self.post_delay {
            encode_context_unsigned(buffer, 6, delay as u64)?;
        }
        encode_context_boolean(buffer, 7, self.quit_on_failure)?;
        encode_context_boolean(buffer, 8, self.write_successful)?;
        Ok(buffer.len() - start)
    }

    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let mut pos = 0;

        let device_id = if next_is_context(&data[pos..], 0) {
            let ((object_type, instance), consumed) = decode_context_object_id(&data[pos..], 0)?;
            pos += consumed;
            Some(ObjectIdentifier::from_parts(object_type, instance))
        } else {
            None
        };

        let ((object_type, instance), consumed) = decode_context_object_id(&data[pos..], 1)?;
        pos += consumed;
        let object_id = ObjectIdentifier::from_parts(object_type, instance);

        let (property, consumed) = decode_context_enumerated(&data[pos..], 2)?;
        pos += consumed;

        let array_index = if next_is_context(&data[pos..], 3) {
            let (index, consumed) = decode_context_unsigned(&data[pos..], 3)?;
            pos += consumed;
            Some(index as u32)
        } else {
            None
        };

        if !next_is_opening(&data[pos..], 4) {
            return Err(EncodingError::TagMismatch);
        }
        let inner_len = enclosed_data_length(&data[pos..])?;
        pos += 1;
        let (value, value_len) = ApplicationDataValue::decode(&data[pos..pos + inner_len])?;
        if value_len != inner_len {
            return Err(EncodingError::InvalidFormat(
                "trailing bytes in action value".to_string(),
            ));
        }
        pos += inner_len + 1;

        let priority = if next_is_context(&data[pos..], 5) {
            let (priority, consumed) = decode_context_unsigned(&data[pos..], 5)?;
            pos += consumed;
            Some(priority as u8)
        } else {
            None
        };

        let post_delay = if next_is_context(&data[pos..], 6) {
            let (delay, consumed) = decode_context_unsigned(&data[pos..], 6)?;
            pos += consumed;
            Some(delay as u32)
        } else {
            None
        };

        let (quit_on_failure, consumed) = decode_context_boolean(&data[pos..], 7)?;
        pos += consumed;
        let (write_successful, consumed) = decode_context_boolean(&data[pos..], 8)?;
        pos += consumed;

        Ok((
            Self {
                device_id,
                object_id,
                property: PropertyIdentifier::from(property),
                array_index,
                value,
                priority,
                post_delay,
                quit_on_failure,
                write_successful,
            },
            pos,
        ))
    }
}

// ---------------------------------------------------------------------------
// BACnetChannelValue
// ---------------------------------------------------------------------------

/// Value writable to a Channel object: a bare application-tagged primitive
/// or one of the constructed command forms.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelValue {
    Value(ApplicationDataValue),
    LightingCommand(LightingCommand),
    ColorCommand(ColorCommand),
    XyColor(XyColor),
}

impl ChannelValue {
    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        match self {
            ChannelValue::Value(value) => value.encode(buffer),
            ChannelValue::LightingCommand(command) => command.context_encode(buffer, 0),
            ChannelValue::ColorCommand(command) => command.context_encode(buffer, 1),
            ChannelValue::XyColor(color) => color.context_encode(buffer, 2),
        }
    }

    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let (tag, _) = Tag::decode(data)?;
        match (tag.class, tag.number) {
            (TagClass::Opening, number @ 0..=2) => {
                let inner_len = enclosed_data_length(data)?;
                let inner = &data[1..1 + inner_len];
                let (value, consumed) = match number {
                    0 => {
                        let (command, consumed) = LightingCommand::decode(inner)?;
                        (ChannelValue::LightingCommand(command), consumed)
                    }
                    1 => {
                        let (command, consumed) = ColorCommand::decode(inner)?;
                        (ChannelValue::ColorCommand(command), consumed)
                    }
                    _ => {
                        let (color, consumed) = XyColor::decode(inner)?;
                        (ChannelValue::XyColor(color), consumed)
                    }
                };
                if consumed != inner_len {
                    return Err(EncodingError::InvalidFormat(
                        "trailing bytes in channel value".to_string(),
                    ));
                }
                Ok((value, inner_len + 2))
            }
            (TagClass::Application, _) => {
                let (value, consumed) = ApplicationDataValue::decode(data)?;
                Ok((ChannelValue::Value(value), consumed))
            }
            _ => Err(EncodingError::InvalidTag),
        }
    }
}

// ---------------------------------------------------------------------------
// BACnetTimeValue / BACnetDailySchedule
// ---------------------------------------------------------------------------

/// A schedule entry: a start time and the value that takes effect at it.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeValue {
    pub time: Time,
    pub value: ApplicationDataValue,
}

impl TimeValue {
    pub fn new(time: Time, value: ApplicationDataValue) -> Self {
        Self { time, value }
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let mut written = encode_application_time(buffer, &self.time)?;
        written += self.value.encode(buffer)?;
        Ok(written)
    }

    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let (time, consumed_time) = decode_application_time(data)?;
        let (value, consumed_value) = ApplicationDataValue::decode(&data[consumed_time..])?;
        Ok((Self { time, value }, consumed_time + consumed_value))
    }
}

/// One day of a weekly schedule: `[0] { (time, value)* }`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DailySchedule {
    pub entries: Vec<TimeValue>,
}

impl DailySchedule {
    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let start = buffer.len();
        encode_opening_tag(buffer, 0)?;
        for entry in &self.entries {
            entry.encode(buffer)?;
        }
        encode_closing_tag(buffer, 0)?;
        Ok(buffer.len() - start)
    }

    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        if !next_is_opening(data, 0) {
            return Err(EncodingError::TagMismatch);
        }
        let inner_len = enclosed_data_length(data)?;
        let mut entries = Vec::new();
        let mut pos = 1;
        while pos < 1 + inner_len {
            let (entry, consumed) = TimeValue::decode(&data[pos..1 + inner_len])?;
            entries.push(entry);
            pos += consumed;
        }
        Ok((Self { entries }, inner_len + 2))
    }
}

// ---------------------------------------------------------------------------
// BACnetRecipient / BACnetDestination (Notification Class recipient-list)
// ---------------------------------------------------------------------------

/// `BACnetRecipient ::= CHOICE { [0] device object-id, [1] address }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Device(ObjectIdentifier),
    Address { network: u16, mac: Vec<u8> },
}

impl Recipient {
    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let start = buffer.len();
        match self {
            Recipient::Device(id) => {
                encode_context_object_id(buffer, 0, id.object_type.into(), id.instance)?;
            }
            Recipient::Address { network, mac } => {
                encode_opening_tag(buffer, 1)?;
                crate::encoding::encode_application_unsigned(buffer, *network as u64)?;
                crate::encoding::encode_application_octet_string(buffer, mac)?;
                encode_closing_tag(buffer, 1)?;
            }
        }
        Ok(buffer.len() - start)
    }

    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let (tag, _) = Tag::decode(data)?;
        match (tag.class, tag.number) {
            (TagClass::Context, 0) => {
                let ((object_type, instance), consumed) = decode_context_object_id(data, 0)?;
                Ok((
                    Recipient::Device(ObjectIdentifier::from_parts(object_type, instance)),
                    consumed,
                ))
            }
            (TagClass::Opening, 1) => {
                let inner_len = enclosed_data_length(data)?;
                let inner = &data[1..1 + inner_len];
                let (network, consumed_net) =
                    crate::encoding::decode_application_unsigned(inner)?;
                let (mac, consumed_mac) =
                    crate::encoding::decode_application_octet_string(&inner[consumed_net..])?;
                if consumed_net + consumed_mac != inner_len {
                    return Err(EncodingError::InvalidFormat(
                        "trailing bytes in recipient address".to_string(),
                    ));
                }
                Ok((
                    Recipient::Address {
                        network: network as u16,
                        mac,
                    },
                    inner_len + 2,
                ))
            }
            _ => Err(EncodingError::InvalidTag),
        }
    }
}

/// One recipient-list element of a Notification Class object.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub valid_days: crate::encoding::BitString,
    pub from_time: Time,
    pub to_time: Time,
    pub recipient: Recipient,
    pub process_identifier: u32,
    pub issue_confirmed_notifications: bool,
    pub transitions: crate::encoding::BitString,
}

impl Destination {
    /// A destination for one device, active all week, all day.
    pub fn for_device(device_id: ObjectIdentifier, process_identifier: u32) -> Self {
        Self {
            valid_days: crate::encoding::BitString::from_bits(&[true; 7]),
            from_time: Time::new(0, 0, 0, 0),
            to_time: Time::new(23, 59, 59, 99),
            recipient: Recipient::Device(device_id),
            process_identifier,
            issue_confirmed_notifications: false,
            transitions: crate::encoding::BitString::from_bits(&[true; 3]),
        }
    }

    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<usize> {
        let start = buffer.len();
        crate::encoding::encode_application_bit_string(buffer, &self.valid_days)?;
        encode_application_time(buffer, &self.from_time)?;
        encode_application_time(buffer, &self.to_time)?;
        self.recipient.encode(buffer)?;
        crate::encoding::encode_application_unsigned(buffer, self.process_identifier as u64)?;
        crate::encoding::encode_application_boolean(buffer, self.issue_confirmed_notifications)?;
        crate::encoding::encode_application_bit_string(buffer, &self.transitions)?;
        Ok(buffer.len() - start)
    }

    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        let mut pos = 0;
        let (valid_days, consumed) = crate::encoding::decode_application_bit_string(data)?;
        pos += consumed;
        let (from_time, consumed) = decode_application_time(&data[pos..])?;
        pos += consumed;
        let (to_time, consumed) = decode_application_time(&data[pos..])?;
        pos += consumed;
        let (recipient, consumed) = Recipient::decode(&data[pos..])?;
        pos += consumed;
        let (process_identifier, consumed) =
            crate::encoding::decode_application_unsigned(&data[pos..])?;
        pos += consumed;
        let (issue_confirmed, consumed) =
            crate::encoding::decode_application_boolean(&data[pos..])?;
        pos += consumed;
        let (transitions, consumed) = crate::encoding::decode_application_bit_string(&data[pos..])?;
        pos += consumed;

        Ok((
            Self {
                valid_days,
                from_time,
                to_time,
                recipient,
                process_identifier: process_identifier as u32,
                issue_confirmed_notifications: issue_confirmed,
                transitions,
            },
            pos,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectType;

    #[cfg(not(feature = "std"))]
    use alloc::{vec, vec::Vec};

    #[test]
    fn test_enclosed_data_length() {
        let mut buffer = Vec::new();
        encode_opening_tag(&mut buffer, 3).unwrap();
        crate::encoding::encode_application_real(&mut buffer, 1.5).unwrap();
        encode_opening_tag(&mut buffer, 0).unwrap();
        crate::encoding::encode_application_unsigned(&mut buffer, 7).unwrap();
        encode_closing_tag(&mut buffer, 0).unwrap();
        encode_closing_tag(&mut buffer, 3).unwrap();

        let inner = enclosed_data_length(&buffer).unwrap();
        assert_eq!(inner, buffer.len() - 2);
    }

    #[test]
    fn test_enclosed_data_length_unterminated() {
        let mut buffer = Vec::new();
        encode_opening_tag(&mut buffer, 3).unwrap();
        crate::encoding::encode_application_real(&mut buffer, 1.5).unwrap();
        assert!(enclosed_data_length(&buffer).is_err());
    }

    #[test]
    fn test_property_value_roundtrip() {
        let value = PropertyValue {
            property: PropertyIdentifier::PresentValue,
            array_index: Some(2),
            value: ApplicationDataValue::Real(20.5),
            priority: Some(8),
        };
        let mut buffer = Vec::new();
        let written = value.encode(&mut buffer).unwrap();
        assert_eq!(written, buffer.len());

        let (decoded, consumed) = PropertyValue::decode(&buffer).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(consumed, buffer.len());
    }

    #[test]
    fn test_property_value_minimal() {
        let value = PropertyValue::new(
            PropertyIdentifier::StatusFlags,
            ApplicationDataValue::BitString(crate::encoding::BitString::from_bits(&[
                false, false, false, false,
            ])),
        );
        let mut buffer = Vec::new();
        value.encode(&mut buffer).unwrap();
        let (decoded, consumed) = PropertyValue::decode(&buffer).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(consumed, buffer.len());
    }

    #[test]
    fn test_read_access_specification_roundtrip() {
        let mut spec =
            ReadAccessSpecification::new(ObjectIdentifier::new(ObjectType::AnalogInput, 4));
        spec.add_property(PropertyReference::new(PropertyIdentifier::PresentValue));
        spec.add_property(PropertyReference::with_array_index(
            PropertyIdentifier::PriorityArray,
            3,
        ));

        let mut buffer = Vec::new();
        spec.encode(&mut buffer).unwrap();
        let (decoded, consumed) = ReadAccessSpecification::decode(&buffer).unwrap();
        assert_eq!(decoded, spec);
        assert_eq!(consumed, buffer.len());
    }

    #[test]
    fn test_xy_color_roundtrip() {
        let color = XyColor::new(0.4051, 0.3906);
        assert!(color.is_valid());

        let mut buffer = Vec::new();
        color.encode(&mut buffer).unwrap();
        assert_eq!(buffer.len(), 10);
        let (decoded, consumed) = XyColor::decode(&buffer).unwrap();
        assert_eq!(decoded, color);
        assert_eq!(consumed, 10);

        buffer.clear();
        color.context_encode(&mut buffer, 2).unwrap();
        let (decoded, consumed) = XyColor::context_decode(&buffer, 2).unwrap();
        assert_eq!(decoded, color);
        assert_eq!(consumed, buffer.len());
    }

    #[test]
    fn test_lighting_command_roundtrip() {
        let command = LightingCommand {
            operation: LightingOperation::FadeTo,
            target_level: Some(75.0),
            ramp_rate: None,
            step_increment: None,
            fade_time: Some(2000),
            priority: Some(8),
        };
        let mut buffer = Vec::new();
        command.encode(&mut buffer).unwrap();
        let (decoded, consumed) = LightingCommand::decode(&buffer).unwrap();
        assert_eq!(decoded, command);
        assert_eq!(consumed, buffer.len());
    }

    #[test]
    fn test_lighting_command_rejects_bad_ranges() {
        let mut buffer = Vec::new();
        let command = LightingCommand::fade_to(150.0, None);
        assert!(command.encode(&mut buffer).is_err());

        let command = LightingCommand {
            fade_time: Some(10),
            ..LightingCommand::new(LightingOperation::FadeTo)
        };
        assert!(command.encode(&mut buffer).is_err());
    }

    #[test]
    fn test_color_command_roundtrip() {
        let command = ColorCommand::fade_to_color(XyColor::new(0.3, 0.3), Some(1000));
        let mut buffer = Vec::new();
        command.encode(&mut buffer).unwrap();
        let (decoded, consumed) = ColorCommand::decode(&buffer).unwrap();
        assert_eq!(decoded, command);
        assert_eq!(consumed, buffer.len());

        let command = ColorCommand {
            target_color_temperature: Some(4000),
            ramp_rate: Some(100),
            ..ColorCommand::new(ColorOperation::RampToCct)
        };
        buffer.clear();
        command.encode(&mut buffer).unwrap();
        let (decoded, _) = ColorCommand::decode(&buffer).unwrap();
        assert_eq!(decoded, command);
    }

    #[test]
    fn test_calendar_entry_roundtrip() {
        let entries = [
            CalendarEntry::Date(Date::new(2026, 12, 25, Date::WILDCARD)),
            CalendarEntry::DateRange(DateRange::new(
                Date::new(2026, 7, 1, Date::WILDCARD),
                Date::new(2026, 7, 31, Date::WILDCARD),
            )),
            CalendarEntry::WeekNDay(WeekNDay {
                month: Date::WILDCARD,
                week_of_month: 1,
                day_of_week: 1,
            }),
        ];
        for entry in entries {
            let mut buffer = Vec::new();
            entry.encode(&mut buffer).unwrap();
            let (decoded, consumed) = CalendarEntry::decode(&buffer).unwrap();
            assert_eq!(decoded, entry);
            assert_eq!(consumed, buffer.len());
        }
    }

    #[test]
    fn test_calendar_entry_matching() {
        let christmas = Date::new(2026, 12, 25, 5);
        assert!(CalendarEntry::Date(Date::new(
            Date::UNSPECIFIED_YEAR,
            12,
            25,
            Date::WILDCARD
        ))
        .matches(&christmas));

        let july = CalendarEntry::DateRange(DateRange::new(
            Date::new(2026, 7, 1, Date::WILDCARD),
            Date::new(2026, 7, 31, Date::WILDCARD),
        ));
        assert!(july.matches(&Date::new(2026, 7, 15, 3)));
        assert!(!july.matches(&Date::new(2026, 8, 1, 6)));

        // First Monday of any month.
        let first_monday = CalendarEntry::WeekNDay(WeekNDay {
            month: Date::WILDCARD,
            week_of_month: 1,
            day_of_week: 1,
        });
        assert!(first_monday.matches(&Date::new(2026, 6, 1, 1)));
        assert!(!first_monday.matches(&Date::new(2026, 6, 8, 1)));

        // Last seven days of February in a leap year.
        let last_week = WeekNDay {
            month: 2,
            week_of_month: 6,
            day_of_week: Date::WILDCARD,
        };
        assert!(last_week.matches(&Date::new(2024, 2, 23, 5)));
        assert!(!last_week.matches(&Date::new(2024, 2, 22, 4)));
    }

    #[test]
    fn test_action_command_roundtrip() {
        let command = ActionCommand {
            device_id: None,
            object_id: ObjectIdentifier::new(ObjectType::AnalogValue, 3),
            property: PropertyIdentifier::PresentValue,
            array_index: None,
            value: ApplicationDataValue::Real(68.0),
            priority: Some(10),
            post_delay: Some(5),
            quit_on_failure: true,
            write_successful: false,
        };
        let mut buffer = Vec::new();
        command.encode(&mut buffer).unwrap();
        let (decoded, consumed) = ActionCommand::decode(&buffer).unwrap();
        assert_eq!(decoded, command);
        assert_eq!(consumed, buffer.len());
    }

    #[test]
    fn test_channel_value_roundtrip() {
        let values = [
            ChannelValue::Value(ApplicationDataValue::Real(55.0)),
            ChannelValue::Value(ApplicationDataValue::Null),
            ChannelValue::LightingCommand(LightingCommand::fade_to(50.0, Some(1000))),
            ChannelValue::ColorCommand(ColorCommand::new(ColorOperation::Stop)),
            ChannelValue::XyColor(XyColor::new(0.25, 0.5)),
        ];
        for value in values {
            let mut buffer = Vec::new();
            value.encode(&mut buffer).unwrap();
            let (decoded, consumed) = ChannelValue::decode(&buffer).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(consumed, buffer.len(), "{:?}", decoded);
        }
    }

    #[test]
    fn test_daily_schedule_roundtrip() {
        let schedule = DailySchedule {
            entries: vec![
                TimeValue::new(Time::new(8, 0, 0, 0), ApplicationDataValue::Real(21.0)),
                TimeValue::new(Time::new(18, 0, 0, 0), ApplicationDataValue::Real(16.0)),
            ],
        };
        let mut buffer = Vec::new();
        schedule.encode(&mut buffer).unwrap();
        let (decoded, consumed) = DailySchedule::decode(&buffer).unwrap();
        assert_eq!(decoded, schedule);
        assert_eq!(consumed, buffer.len());
    }

    #[test]
    fn test_destination_roundtrip() {
        let destination = Destination::for_device(
            ObjectIdentifier::new(ObjectType::Device, 1234),
            42,
        );
        let mut buffer = Vec::new();
        destination.encode(&mut buffer).unwrap();
        let (decoded, consumed) = Destination::decode(&buffer).unwrap();
        assert_eq!(decoded, destination);
        assert_eq!(consumed, buffer.len());

        let destination = Destination {
            recipient: Recipient::Address {
                network: 100,
                mac: vec![0xC0, 0xA8, 0x01, 0x0A, 0xBA, 0xC0],
            },
            ..destination
        };
        buffer.clear();
        destination.encode(&mut buffer).unwrap();
        let (decoded, _) = Destination::decode(&buffer).unwrap();
        assert_eq!(decoded, destination);
    }
}
