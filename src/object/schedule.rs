//! Schedule Object
//!
//! A weekly schedule of time/value pairs. The present-value is the value of
//! the latest entry of today's daily schedule whose start time is at or
//! before the current time; with no such entry, or outside the effective
//! period, the schedule-default applies. A Null entry value also hands
//! control back to the default.

use crate::encoding::constructed::{DailySchedule, DateRange, TimeValue};
use crate::encoding::value::ApplicationDataValue;
use crate::encoding::{CharacterString, Date, Time};
use crate::object::{
    encode_array_property, AccessResult, InstanceList, ObjectHandler, ObjectType, PropertyError,
    PropertyIdentifier, PropertyLists, ReadPropertyData, StatusFlags, WritePropertyData,
};

#[cfg(not(feature = "std"))]
use alloc::{format, vec::Vec};

const SCHEDULE_PROPERTIES_REQUIRED: &[PropertyIdentifier] = &[
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::PresentValue,
    PropertyIdentifier::EffectivePeriod,
    PropertyIdentifier::ScheduleDefault,
    PropertyIdentifier::StatusFlags,
    PropertyIdentifier::Reliability,
    PropertyIdentifier::OutOfService,
    PropertyIdentifier::PropertyList,
];

const SCHEDULE_PROPERTIES_OPTIONAL: &[PropertyIdentifier] =
    &[PropertyIdentifier::WeeklySchedule];

const NO_PROPERTIES: &[PropertyIdentifier] = &[];

const DAYS_PER_WEEK: usize = 7;

/// Schedule object state
#[derive(Debug, Clone)]
pub struct Schedule {
    name: Option<CharacterString>,
    /// Monday-first, one daily schedule per weekday.
    pub weekly_schedule: [DailySchedule; DAYS_PER_WEEK],
    pub schedule_default: ApplicationDataValue,
    pub effective_period: DateRange,
    pub out_of_service: bool,
}

impl Schedule {
    fn new() -> Self {
        Self {
            name: None,
            weekly_schedule: Default::default(),
            schedule_default: ApplicationDataValue::Null,
            effective_period: DateRange::new(Date::unspecified(), Date::unspecified()),
            out_of_service: false,
        }
    }

    /// Evaluate the schedule for a date and time.
    pub fn present_value(&self, date: &Date, time: &Time) -> ApplicationDataValue {
        if !self.effective_period.contains(date) {
            return self.schedule_default.clone();
        }
        let weekday = date.weekday;
        if !(1..=7).contains(&weekday) {
            return self.schedule_default.clone();
        }
        let day = &self.weekly_schedule[(weekday - 1) as usize];

        // Entries are scanned in order; the latest start <= now wins.
        let mut selected: Option<&TimeValue> = None;
        for entry in &day.entries {
            if entry.time <= *time
                && selected.map(|current| current.time <= entry.time).unwrap_or(true)
            {
                selected = Some(entry);
            }
        }
        match selected {
            Some(entry) if !entry.value.is_null() => entry.value.clone(),
            _ => self.schedule_default.clone(),
        }
    }
}

/// Schedule object handler
#[derive(Debug, Default)]
pub struct ScheduleHandler {
    objects: InstanceList<Schedule>,
    local_date: Option<Date>,
    local_time: Option<Time>,
}

impl ScheduleHandler {
    pub fn new() -> Self {
        Self {
            objects: InstanceList::new(),
            local_date: None,
            local_time: None,
        }
    }

    /// Pin the evaluation clock (ports without a local clock, tests).
    pub fn set_local_clock(&mut self, date: Date, time: Time) {
        self.local_date = Some(date);
        self.local_time = Some(time);
    }

    fn now(&self) -> (Date, Time) {
        #[cfg(feature = "std")]
        {
            (
                self.local_date.unwrap_or_else(Date::today),
                self.local_time.unwrap_or_else(Time::now),
            )
        }
        #[cfg(not(feature = "std"))]
        {
            (
                self.local_date.unwrap_or_default(),
                self.local_time.unwrap_or_default(),
            )
        }
    }

    pub fn present_value(&self, instance: u32) -> Option<ApplicationDataValue> {
        let (date, time) = self.now();
        self.objects
            .get(instance)
            .map(|object| object.present_value(&date, &time))
    }

    pub fn set_default(&mut self, instance: u32, value: ApplicationDataValue) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.schedule_default = value;
        }
    }

    pub fn set_effective_period(&mut self, instance: u32, period: DateRange) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.effective_period = period;
        }
    }

    /// Replace one weekday's entries (1 = Monday .. 7 = Sunday).
    pub fn set_daily_schedule(&mut self, instance: u32, weekday: u8, entries: Vec<TimeValue>) {
        if !(1..=7).contains(&weekday) {
            return;
        }
        if let Some(object) = self.objects.get_mut(instance) {
            object.weekly_schedule[(weekday - 1) as usize] = DailySchedule { entries };
        }
    }

    pub fn set_name(&mut self, instance: u32, name: CharacterString) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.name = Some(name);
        }
    }
}

impl ObjectHandler for ScheduleHandler {
    fn object_type(&self) -> ObjectType {
        ObjectType::Schedule
    }

    fn property_lists(&self) -> PropertyLists {
        PropertyLists {
            required: SCHEDULE_PROPERTIES_REQUIRED,
            optional: SCHEDULE_PROPERTIES_OPTIONAL,
            proprietary: NO_PROPERTIES,
        }
    }

    fn count(&self) -> usize {
        self.objects.count()
    }

    fn valid_instance(&self, instance: u32) -> bool {
        self.objects.contains(instance)
    }

    fn index_to_instance(&self, index: usize) -> Option<u32> {
        self.objects.index_to_instance(index)
    }

    fn instance_to_index(&self, instance: u32) -> Option<usize> {
        self.objects.instance_to_index(instance)
    }

    fn object_name(&self, instance: u32) -> Option<CharacterString> {
        let object = self.objects.get(instance)?;
        Some(match &object.name {
            Some(name) => name.clone(),
            None => CharacterString::new(&format!("SCHEDULE {}", instance)),
        })
    }

    fn set_object_name(&mut self, instance: u32, name: CharacterString) -> bool {
        match self.objects.get_mut(instance) {
            Some(object) => {
                object.name = Some(name);
                true
            }
            None => false,
        }
    }

    fn create(&mut self, instance: u32) -> Result<u32, PropertyError> {
        let instance = if instance == crate::BACNET_MAX_INSTANCE {
            self.objects.next_free_instance()
        } else {
            instance
        };
        self.objects.insert(instance, Schedule::new())?;
        Ok(instance)
    }

    fn delete(&mut self, instance: u32) -> bool {
        self.objects.remove(instance).is_some()
    }

    fn read_property(
        &self,
        request: &ReadPropertyData,
        buffer: &mut Vec<u8>,
    ) -> AccessResult<usize> {
        let object = self
            .objects
            .get(request.object_instance)
            .ok_or(PropertyError::unknown_object())?;
        let start = buffer.len();
        match request.property {
            PropertyIdentifier::PresentValue => {
                let (date, time) = self.now();
                object
                    .present_value(&date, &time)
                    .encode(buffer)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::ScheduleDefault => {
                object
                    .schedule_default
                    .encode(buffer)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::EffectivePeriod => {
                object
                    .effective_period
                    .encode(buffer)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::WeeklySchedule => {
                return encode_array_property(
                    buffer,
                    request.array_index,
                    DAYS_PER_WEEK as u32,
                    |index, buffer| {
                        object.weekly_schedule[(index - 1) as usize].encode(buffer)
                    },
                );
            }
            PropertyIdentifier::StatusFlags => {
                let mut flags = StatusFlags::empty();
                if object.out_of_service {
                    flags |= StatusFlags::OUT_OF_SERVICE;
                }
                crate::encoding::encode_application_bit_string(buffer, &flags.to_bit_string())
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::Reliability => {
                crate::encoding::encode_application_enumerated(buffer, 0)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::OutOfService => {
                crate::encoding::encode_application_boolean(buffer, object.out_of_service)
                    .map_err(|_| PropertyError::value_out_of_range())?;
            }
            _ => return Err(PropertyError::unknown_property().into()),
        }
        Ok(buffer.len() - start)
    }

    fn write_property(&mut self, request: &WritePropertyData) -> AccessResult<()> {
        let object = self
            .objects
            .get_mut(request.object_instance)
            .ok_or(PropertyError::unknown_object())?;
        match request.property {
            PropertyIdentifier::ScheduleDefault => {
                object.schedule_default = request.value.clone();
                Ok(())
            }
            PropertyIdentifier::OutOfService => match request.value {
                ApplicationDataValue::Boolean(value) => {
                    object.out_of_service = value;
                    Ok(())
                }
                _ => Err(PropertyError::invalid_data_type().into()),
            },
            _ => Err(PropertyError::write_access_denied().into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "std"))]
    use alloc::vec;

    fn office_schedule() -> ScheduleHandler {
        let mut handler = ScheduleHandler::new();
        handler.create(1).unwrap();
        handler.set_default(1, ApplicationDataValue::Real(16.0));
        handler.set_effective_period(
            1,
            DateRange::new(
                Date::new(2026, 1, 1, Date::WILDCARD),
                Date::new(2026, 12, 31, Date::WILDCARD),
            ),
        );
        // Weekdays: warm up at 08:00, set back at 18:00.
        for weekday in 1..=5 {
            handler.set_daily_schedule(
                1,
                weekday,
                vec![
                    TimeValue::new(Time::new(8, 0, 0, 0), ApplicationDataValue::Real(21.0)),
                    TimeValue::new(Time::new(18, 0, 0, 0), ApplicationDataValue::Real(16.0)),
                ],
            );
        }
        handler
    }

    #[test]
    fn test_active_entry_selected() {
        let mut handler = office_schedule();
        // Wednesday mid-morning.
        handler.set_local_clock(Date::new(2026, 6, 3, 3), Time::new(10, 30, 0, 0));
        assert_eq!(
            handler.present_value(1),
            Some(ApplicationDataValue::Real(21.0))
        );
    }

    #[test]
    fn test_before_first_entry_uses_default() {
        let mut handler = office_schedule();
        handler.set_local_clock(Date::new(2026, 6, 3, 3), Time::new(6, 0, 0, 0));
        assert_eq!(
            handler.present_value(1),
            Some(ApplicationDataValue::Real(16.0))
        );
    }

    #[test]
    fn test_evening_entry_takes_over() {
        let mut handler = office_schedule();
        handler.set_local_clock(Date::new(2026, 6, 3, 3), Time::new(22, 0, 0, 0));
        assert_eq!(
            handler.present_value(1),
            Some(ApplicationDataValue::Real(16.0))
        );
    }

    #[test]
    fn test_weekend_has_no_entries() {
        let mut handler = office_schedule();
        // Saturday.
        handler.set_local_clock(Date::new(2026, 6, 6, 6), Time::new(10, 0, 0, 0));
        assert_eq!(
            handler.present_value(1),
            Some(ApplicationDataValue::Real(16.0))
        );
    }

    #[test]
    fn test_outside_effective_period_uses_default() {
        let mut handler = office_schedule();
        handler.set_effective_period(
            1,
            DateRange::new(
                Date::new(2026, 9, 1, Date::WILDCARD),
                Date::new(2026, 9, 30, Date::WILDCARD),
            ),
        );
        handler.set_local_clock(Date::new(2026, 6, 3, 3), Time::new(10, 30, 0, 0));
        assert_eq!(
            handler.present_value(1),
            Some(ApplicationDataValue::Real(16.0))
        );
    }

    #[test]
    fn test_weekly_schedule_array_read() {
        let handler = office_schedule();
        let mut buffer = Vec::new();
        handler
            .read_property(
                &ReadPropertyData {
                    object_instance: 1,
                    property: PropertyIdentifier::WeeklySchedule,
                    array_index: 3,
                },
                &mut buffer,
            )
            .unwrap();
        let (day, _) = DailySchedule::decode(&buffer).unwrap();
        assert_eq!(day.entries.len(), 2);
    }
}
