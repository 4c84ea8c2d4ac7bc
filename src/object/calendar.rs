//! Calendar Object
//!
//! A Calendar holds a date-list of [`CalendarEntry`] values; its
//! present-value is true whenever the current date matches any entry. The
//! date-list is a BACnetLIST and accepts AddListElement and
//! RemoveListElement.

use crate::encoding::constructed::CalendarEntry;
use crate::encoding::value::ApplicationDataValue;
use crate::encoding::{CharacterString, Date};
use crate::object::{
    AccessResult, InstanceList, ListElementData, ListElementError, ObjectHandler, ObjectType,
    PropertyError, PropertyIdentifier, PropertyLists, ReadPropertyData, StatusFlags,
    WritePropertyData,
};
use crate::service::{ErrorClass, ErrorCode};

#[cfg(not(feature = "std"))]
use alloc::{format, vec::Vec};

const CALENDAR_PROPERTIES_REQUIRED: &[PropertyIdentifier] = &[
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::PresentValue,
    PropertyIdentifier::DateList,
    PropertyIdentifier::StatusFlags,
    PropertyIdentifier::PropertyList,
];

const NO_PROPERTIES: &[PropertyIdentifier] = &[];

/// Calendar object state
#[derive(Debug, Clone, Default)]
pub struct Calendar {
    name: Option<CharacterString>,
    pub date_list: Vec<CalendarEntry>,
}

impl Calendar {
    /// True when any date-list entry covers `date`.
    pub fn present_value(&self, date: &Date) -> bool {
        self.date_list.iter().any(|entry| entry.matches(date))
    }
}

/// Calendar object handler
#[derive(Debug, Default)]
pub struct CalendarHandler {
    objects: InstanceList<Calendar>,
    /// Test/override hook; when unset the local clock is used.
    local_date: Option<Date>,
}

impl CalendarHandler {
    pub fn new() -> Self {
        Self {
            objects: InstanceList::new(),
            local_date: None,
        }
    }

    /// Pin the evaluation date (ports without a local clock, tests).
    pub fn set_local_date(&mut self, date: Date) {
        self.local_date = Some(date);
    }

    fn today(&self) -> Date {
        #[cfg(feature = "std")]
        {
            self.local_date.unwrap_or_else(Date::today)
        }
        #[cfg(not(feature = "std"))]
        {
            self.local_date.unwrap_or_default()
        }
    }

    pub fn present_value(&self, instance: u32) -> Option<bool> {
        let today = self.today();
        self.objects
            .get(instance)
            .map(|object| object.present_value(&today))
    }

    pub fn add_entry(&mut self, instance: u32, entry: CalendarEntry) -> bool {
        match self.objects.get_mut(instance) {
            Some(object) => {
                object.date_list.push(entry);
                true
            }
            None => false,
        }
    }

    pub fn date_list(&self, instance: u32) -> Option<&[CalendarEntry]> {
        self.objects.get(instance).map(|object| object.date_list.as_slice())
    }

    pub fn set_name(&mut self, instance: u32, name: CharacterString) {
        if let Some(object) = self.objects.get_mut(instance) {
            object.name = Some(name);
        }
    }

    fn decode_entries(payload: &[u8]) -> Result<Vec<CalendarEntry>, ListElementError> {
        let mut entries = Vec::new();
        let mut pos = 0;
        while pos < payload.len() {
            match CalendarEntry::decode(&payload[pos..]) {
                Ok((entry, consumed)) => {
                    entries.push(entry);
                    pos += consumed;
                }
                Err(_) => {
                    return Err(ListElementError::new(
                        PropertyError::new(ErrorClass::Property, ErrorCode::InvalidDataType),
                        entries.len() as u32 + 1,
                    ));
                }
            }
        }
        Ok(entries)
    }
}

impl ObjectHandler for CalendarHandler {
    fn object_type(&self) -> ObjectType {
        ObjectType::Calendar
    }

    fn property_lists(&self) -> PropertyLists {
        PropertyLists {
            required: CALENDAR_PROPERTIES_REQUIRED,
            optional: NO_PROPERTIES,
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
            None => CharacterString::new(&format!("CALENDAR {}", instance)),
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
        self.objects.insert(instance, Calendar::default())?;
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
                let today = self.today();
                crate::encoding::encode_application_boolean(
                    buffer,
                    object.present_value(&today),
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            PropertyIdentifier::DateList => {
                for entry in &object.date_list {
                    entry
                        .encode(buffer)
                        .map_err(|_| PropertyError::value_out_of_range())?;
                }
            }
            PropertyIdentifier::StatusFlags => {
                crate::encoding::encode_application_bit_string(
                    buffer,
                    &StatusFlags::empty().to_bit_string(),
                )
                .map_err(|_| PropertyError::value_out_of_range())?;
            }
            _ => return Err(PropertyError::unknown_property().into()),
        }
        Ok(buffer.len() - start)
    }

    fn write_property(&mut self, request: &WritePropertyData) -> AccessResult<()> {
        if !self.objects.contains(request.object_instance) {
            return Err(PropertyError::unknown_object().into());
        }
        match (request.property, &request.value) {
            // The whole date-list is replaced through ALE/RLE; plain writes
            // only clear it.
            (PropertyIdentifier::DateList, ApplicationDataValue::Null) => {
                let object = self.objects.get_mut(request.object_instance).unwrap();
                object.date_list.clear();
                Ok(())
            }
            _ => Err(PropertyError::write_access_denied().into()),
        }
    }

    fn add_list_element(&mut self, request: &ListElementData) -> Result<(), ListElementError> {
        if request.property != PropertyIdentifier::DateList {
            return Err(ListElementError::new(PropertyError::not_a_list(), 0));
        }
        let entries = Self::decode_entries(&request.elements)?;
        let object = self
            .objects
            .get_mut(request.object_instance)
            .ok_or_else(|| ListElementError::new(PropertyError::unknown_object(), 0))?;
        object.date_list.extend(entries);
        Ok(())
    }

    fn remove_list_element(&mut self, request: &ListElementData) -> Result<(), ListElementError> {
        if request.property != PropertyIdentifier::DateList {
            return Err(ListElementError::new(PropertyError::not_a_list(), 0));
        }
        let entries = Self::decode_entries(&request.elements)?;
        let object = self
            .objects
            .get_mut(request.object_instance)
            .ok_or_else(|| ListElementError::new(PropertyError::unknown_object(), 0))?;

        // Verify every element is present before mutating anything.
        for (index, entry) in entries.iter().enumerate() {
            if !object.date_list.contains(entry) {
                return Err(ListElementError::new(
                    PropertyError::new(ErrorClass::Services, ErrorCode::ListElementNotFound),
                    index as u32 + 1,
                ));
            }
        }
        for entry in &entries {
            if let Some(position) = object.date_list.iter().position(|e| e == entry) {
                object.date_list.remove(position);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::constructed::{DateRange, WeekNDay};
    use crate::BACNET_ARRAY_ALL;

    #[test]
    fn test_present_value_matches_entries() {
        let mut handler = CalendarHandler::new();
        handler.create(1).unwrap();
        handler.set_local_date(Date::new(2026, 12, 25, 5));

        assert_eq!(handler.present_value(1), Some(false));

        handler.add_entry(
            1,
            CalendarEntry::Date(Date::new(Date::UNSPECIFIED_YEAR, 12, 25, Date::WILDCARD)),
        );
        assert_eq!(handler.present_value(1), Some(true));
    }

    #[test]
    fn test_list_element_operations() {
        let mut handler = CalendarHandler::new();
        handler.create(1).unwrap();

        let entry = CalendarEntry::DateRange(DateRange::new(
            Date::new(2026, 7, 1, Date::WILDCARD),
            Date::new(2026, 7, 31, Date::WILDCARD),
        ));
        let mut payload = Vec::new();
        entry.encode(&mut payload).unwrap();

        handler
            .add_list_element(&ListElementData {
                object_instance: 1,
                property: PropertyIdentifier::DateList,
                array_index: BACNET_ARRAY_ALL,
                elements: payload.clone(),
            })
            .unwrap();
        assert_eq!(handler.date_list(1).unwrap().len(), 1);

        handler
            .remove_list_element(&ListElementData {
                object_instance: 1,
                property: PropertyIdentifier::DateList,
                array_index: BACNET_ARRAY_ALL,
                elements: payload.clone(),
            })
            .unwrap();
        assert!(handler.date_list(1).unwrap().is_empty());

        // Removing again reports the failing element index.
        let error = handler
            .remove_list_element(&ListElementData {
                object_instance: 1,
                property: PropertyIdentifier::DateList,
                array_index: BACNET_ARRAY_ALL,
                elements: payload,
            })
            .unwrap_err();
        assert_eq!(error.first_failed_element, 1);
        assert_eq!(error.error.code, ErrorCode::ListElementNotFound);
    }

    #[test]
    fn test_read_date_list() {
        let mut handler = CalendarHandler::new();
        handler.create(1).unwrap();
        handler.add_entry(
            1,
            CalendarEntry::WeekNDay(WeekNDay {
                month: Date::WILDCARD,
                week_of_month: 1,
                day_of_week: 1,
            }),
        );

        let mut buffer = Vec::new();
        handler
            .read_property(
                &ReadPropertyData {
                    object_instance: 1,
                    property: PropertyIdentifier::DateList,
                    array_index: BACNET_ARRAY_ALL,
                },
                &mut buffer,
            )
            .unwrap();
        let (decoded, _) = CalendarEntry::decode(&buffer).unwrap();
        assert!(matches!(decoded, CalendarEntry::WeekNDay(_)));
    }
}
