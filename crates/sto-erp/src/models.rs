//! # OData Wire Models
//!
//! Shapes of the JSON the 1C OData facade sends and accepts. Field names are
//! the 1C metadata names; Rust names are their English meaning.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

use sto_core::validation::is_empty_ref;
use sto_core::{
    Car, CarRef, CatalogEntry, CatalogRef, ClientDetails, ClientRef, CreatedRecord,
    DocumentState, NewCar, NewClient, OrderRef, OrderRow, OrderSummary, OrderUpdate,
};

// =============================================================================
// Responses
// =============================================================================

/// `{"value": [...]}` envelope of a collection read.
#[derive(Debug, Deserialize)]
pub struct ODataList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// One catalog row. Only the fields the CRM reads are declared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogRecord {
    #[serde(rename = "Ref_Key")]
    pub ref_key: String,

    #[serde(rename = "Description", default, deserialize_with = "lenient_string")]
    pub description: Option<String>,

    #[serde(rename = "Code", default, deserialize_with = "lenient_string")]
    pub code: Option<String>,

    #[serde(rename = "Артикул", default, deserialize_with = "lenient_string")]
    pub article: Option<String>,

    #[serde(rename = "VIN", default, deserialize_with = "lenient_string")]
    pub vin: Option<String>,

    #[serde(rename = "ГосНомер", default, deserialize_with = "lenient_string")]
    pub plate: Option<String>,

    /// Owner of a car record.
    #[serde(rename = "Поставщик_Key", default, deserialize_with = "lenient_string")]
    pub owner_key: Option<String>,
}

impl CatalogRecord {
    pub fn name(&self) -> String {
        self.description.clone().unwrap_or_default()
    }

    pub fn into_entry(self) -> CatalogEntry {
        CatalogEntry {
            name: self.name(),
            reference: CatalogRef::new(self.ref_key),
            code: self.code,
            article: self.article,
            vin: self.vin,
        }
    }

    pub fn into_car(self) -> Car {
        Car {
            name: self.name(),
            reference: CarRef::new(self.ref_key),
            vin: self.vin,
            plate: self.plate,
            owner: self
                .owner_key
                .filter(|k| !is_empty_ref(k))
                .map(ClientRef::new),
        }
    }
}

/// Accounting keys of one `Catalog_Номенклатура` record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NomenclatureRecord {
    #[serde(
        rename = "ОсновнаяЕдиницаИзмерения_Key",
        default,
        deserialize_with = "lenient_string"
    )]
    pub unit: Option<String>,

    #[serde(rename = "СтавкаНДС_Key", default, deserialize_with = "lenient_string")]
    pub vat_rate: Option<String>,
}

/// Unit and VAT rate to put on a part row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NomenclatureKeys {
    pub unit: String,
    pub vat_rate: String,
}

impl NomenclatureRecord {
    /// Keys of this record; a missing or empty key falls back to `defaults`.
    pub fn keys_or(self, defaults: &NomenclatureKeys) -> NomenclatureKeys {
        NomenclatureKeys {
            unit: self
                .unit
                .filter(|k| !is_empty_ref(k))
                .unwrap_or_else(|| defaults.unit.clone()),
            vat_rate: self
                .vat_rate
                .filter(|k| !is_empty_ref(k))
                .unwrap_or_else(|| defaults.vat_rate.clone()),
        }
    }
}

/// One row of `Catalog_Контрагенты`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientRecord {
    #[serde(rename = "Ref_Key")]
    pub ref_key: String,
    #[serde(rename = "Description", default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(rename = "НаименованиеПолное", default, deserialize_with = "lenient_string")]
    pub full_name: Option<String>,
    #[serde(rename = "Code", default, deserialize_with = "lenient_string")]
    pub code: Option<String>,
    #[serde(rename = "ИНН", default, deserialize_with = "lenient_string")]
    pub inn: Option<String>,
    #[serde(rename = "Комментарий", default, deserialize_with = "lenient_string")]
    pub comment: Option<String>,
    #[serde(rename = "КонтактнаяИнформация", default)]
    pub contacts: Vec<ContactRecord>,
}

/// A row of the client's contact information tabular part.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactRecord {
    #[serde(rename = "Тип", default, deserialize_with = "lenient_string")]
    pub kind: Option<String>,
    #[serde(rename = "НомерТелефона", default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(rename = "Представление", default, deserialize_with = "lenient_string")]
    pub presentation: Option<String>,
}

impl ClientRecord {
    pub fn into_details(self) -> ClientDetails {
        // The last phone wins, the first address wins
        let phone = self
            .contacts
            .iter()
            .filter(|c| c.kind.as_deref() == Some("Телефон"))
            .filter_map(|c| c.phone.clone())
            .last();
        let address = self
            .contacts
            .iter()
            .filter(|c| c.kind.as_deref() == Some("Адрес"))
            .find_map(|c| c.presentation.clone());
        let name = self.description.unwrap_or_default();

        ClientDetails {
            reference: ClientRef::new(self.ref_key),
            full_name: self.full_name.unwrap_or_else(|| name.clone()),
            name,
            code: self.code,
            inn: self.inn,
            comment: self.comment,
            phone,
            address,
        }
    }
}

/// Header of one `Document_ЗаказНаряд`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderRecord {
    #[serde(rename = "Ref_Key")]
    pub ref_key: String,
    #[serde(rename = "Number", alias = "Номер", default, deserialize_with = "lenient_string")]
    pub number: Option<String>,
    #[serde(rename = "Date", default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(rename = "Posted", default)]
    pub posted: bool,
    #[serde(rename = "Контрагент_Key", default, deserialize_with = "lenient_string")]
    pub client_key: Option<String>,
    #[serde(rename = "Контрагент", default)]
    pub client: Option<ExpandedName>,
    #[serde(rename = "СуммаРаботДокумента", default, deserialize_with = "lenient_f64")]
    pub works_sum: f64,
    #[serde(rename = "СуммаНоменклатурыДокумента", default, deserialize_with = "lenient_f64")]
    pub parts_sum: f64,
    #[serde(rename = "СуммаДокумента", default, deserialize_with = "lenient_f64")]
    pub document_sum: f64,
    #[serde(rename = "ОписаниеПричиныОбращения", default, deserialize_with = "lenient_string")]
    pub comment: Option<String>,
    #[serde(rename = "Пробег", default, deserialize_with = "lenient_string")]
    pub mileage: Option<String>,
}

/// An `$expand`ed reference; only its name is read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpandedName {
    #[serde(rename = "Description", default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
}

impl OrderRecord {
    pub fn into_summary(self) -> OrderSummary {
        // Older documents carry only the overall goods sum
        let parts_sum = if self.parts_sum != 0.0 {
            self.parts_sum
        } else {
            self.document_sum
        };

        OrderSummary {
            reference: OrderRef::new(self.ref_key),
            number: self.number.unwrap_or_default(),
            date: self.date.as_deref().and_then(document_date),
            client: self
                .client_key
                .filter(|k| !is_empty_ref(k))
                .map(ClientRef::new),
            client_name: self.client.and_then(|c| c.description),
            state: DocumentState::from_posted(self.posted),
            works_sum: self.works_sum,
            parts_sum,
            comment: self.comment.unwrap_or_default(),
        }
    }
}

/// `2024-05-17T10:31:00` → 2024-05-17. The 1C "empty date" (year 1) is none.
fn document_date(value: &str) -> Option<NaiveDate> {
    let day = value.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .ok()
        .filter(|d| d.year() > 1)
}

/// A row of the `Автоработы` or `Товары` tabular part of a stored order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderLineRecord {
    #[serde(rename = "Авторабота_Key", alias = "Номенклатура_Key", default, deserialize_with = "lenient_string")]
    pub item_key: Option<String>,
    #[serde(rename = "Количество", default, deserialize_with = "lenient_f64")]
    pub qty: f64,
    #[serde(rename = "Цена", default, deserialize_with = "lenient_f64")]
    pub price: f64,
    #[serde(rename = "ПроцентСкидки", default, deserialize_with = "lenient_f64")]
    pub discount: f64,
    #[serde(rename = "Сумма", default, deserialize_with = "lenient_f64")]
    pub sum: f64,
}

impl OrderLineRecord {
    pub fn into_row(self) -> OrderRow {
        OrderRow {
            reference: CatalogRef::new(self.item_key.unwrap_or_default()),
            qty: self.qty,
            price: self.price,
            discount: self.discount,
            sum: self.sum,
        }
    }
}

/// A row of the `Автомобили` tabular part of a stored order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderCarRecord {
    #[serde(rename = "Автомобиль_Key", default, deserialize_with = "lenient_string")]
    pub car_key: Option<String>,
}

/// Empty strings and nulls become `None`; numbers are rendered as text.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Numbers, numeric strings and nulls; anything else reads as 0.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or_default(),
        Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}

/// `{"odata.error": {"code": "...", "message": {"lang": "ru", "value": "..."}}}`
#[derive(Debug, Deserialize)]
pub struct ODataErrorEnvelope {
    #[serde(rename = "odata.error")]
    pub error: ODataErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ODataErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    pub message: ODataErrorMessage,
}

#[derive(Debug, Deserialize)]
pub struct ODataErrorMessage {
    #[serde(default)]
    pub value: String,
}

/// The part of a created document the CRM needs back.
#[derive(Debug, Deserialize)]
pub struct CreatedDocument {
    #[serde(rename = "Number", alias = "Номер", default)]
    pub number: String,

    #[serde(rename = "Ref_Key", default)]
    pub ref_key: Option<String>,
}

/// The echo of a created catalog record.
#[derive(Debug, Deserialize)]
pub struct CreatedCatalogRecord {
    #[serde(rename = "Code", default, deserialize_with = "lenient_string")]
    pub code: Option<String>,

    #[serde(rename = "Ref_Key", default)]
    pub ref_key: Option<String>,
}

impl From<CreatedCatalogRecord> for CreatedRecord {
    fn from(record: CreatedCatalogRecord) -> Self {
        CreatedRecord {
            reference: record.ref_key,
            code: record.code.unwrap_or_default(),
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// `Document_ЗаказНаряд` as posted to the ERP.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairOrderDocument {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Posted")]
    pub posted: bool,

    #[serde(rename = "Организация_Key")]
    pub organization: String,
    #[serde(rename = "ПодразделениеКомпании_Key")]
    pub division: String,
    #[serde(rename = "ТипЦен_Key")]
    pub price_type: String,
    #[serde(rename = "ТипЦенРабот_Key")]
    pub work_price_type: String,
    #[serde(rename = "ВидРемонта_Key")]
    pub repair_type: String,
    #[serde(rename = "Состояние_Key")]
    pub status: String,
    #[serde(rename = "Цех_Key")]
    pub workshop: String,
    #[serde(rename = "Мастер_Key")]
    pub master: String,
    #[serde(rename = "Менеджер_Key")]
    pub manager: String,
    #[serde(rename = "Автор_Key")]
    pub author: String,
    #[serde(rename = "ВалютаДокумента_Key")]
    pub currency: String,
    #[serde(rename = "ХозОперация_Key")]
    pub operation: String,
    #[serde(rename = "СкладКомпании_Key")]
    pub warehouse: String,
    #[serde(rename = "СводныйРемонтныйЗаказ_Key")]
    pub repair_order: String,

    #[serde(rename = "КурсДокумента")]
    pub rate: f64,
    #[serde(rename = "КурсВалютыВзаиморасчетов")]
    pub settlement_rate: f64,
    #[serde(rename = "РегламентированныйУчет")]
    pub regulated_accounting: bool,
    #[serde(rename = "ЗакрыватьЗаказыТолькоПоДанномуЗаказНаряду")]
    pub close_own_orders_only: bool,
    #[serde(rename = "СпособЗачетаАвансов")]
    pub advance_offset: String,

    #[serde(rename = "Контрагент_Key")]
    pub client: String,
    #[serde(rename = "ДоговорВзаиморасчетов_Key", skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,

    #[serde(rename = "ОписаниеПричиныОбращения")]
    pub comment: String,
    #[serde(rename = "Пробег")]
    pub mileage: String,

    #[serde(rename = "Автомобили", skip_serializing_if = "Vec::is_empty")]
    pub cars: Vec<CarRow>,
    #[serde(rename = "Автоработы", skip_serializing_if = "Vec::is_empty")]
    pub works: Vec<WorkRow>,
    #[serde(rename = "Товары", skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<PartRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarRow {
    #[serde(rename = "LineNumber")]
    pub line_number: String,
    #[serde(rename = "Автомобиль_Key")]
    pub car: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkRow {
    #[serde(rename = "LineNumber")]
    pub line_number: String,
    #[serde(rename = "Авторабота_Key")]
    pub work: String,
    #[serde(rename = "Количество")]
    pub qty: f64,
    #[serde(rename = "Нормочас_Key")]
    pub norm_hour: String,
    #[serde(rename = "Коэффициент")]
    pub coefficient: f64,
    #[serde(rename = "Цена")]
    pub price: f64,
    #[serde(rename = "Сумма")]
    pub sum: f64,
    #[serde(rename = "СтавкаНДС_Key")]
    pub vat_rate: String,
    #[serde(rename = "СуммаНДС")]
    pub vat_sum: f64,
    #[serde(rename = "СуммаВсего")]
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartRow {
    #[serde(rename = "LineNumber")]
    pub line_number: String,
    #[serde(rename = "Номенклатура_Key")]
    pub part: String,
    #[serde(rename = "Количество")]
    pub qty: f64,
    #[serde(rename = "ЕдиницаИзмерения_Key")]
    pub unit: String,
    #[serde(rename = "Коэффициент")]
    pub coefficient: f64,
    #[serde(rename = "Цена")]
    pub price: f64,
    #[serde(rename = "Сумма")]
    pub sum: f64,
    #[serde(rename = "СтавкаНДС_Key")]
    pub vat_rate: String,
    #[serde(rename = "СуммаНДС")]
    pub vat_sum: f64,
    #[serde(rename = "ПроцентСкидки")]
    pub discount: f64,
    #[serde(rename = "СуммаВсего")]
    pub total: f64,
    #[serde(rename = "СкладКомпании_Key")]
    pub warehouse: String,
    #[serde(rename = "ХарактеристикаНоменклатуры_Key")]
    pub characteristic: String,
}

/// New `Catalog_Контрагенты` record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientDocument {
    #[serde(rename = "Description")]
    pub name: String,
    #[serde(rename = "НаименованиеПолное")]
    pub full_name: String,
    #[serde(rename = "ИНН", skip_serializing_if = "Option::is_none")]
    pub inn: Option<String>,
    #[serde(rename = "Комментарий", skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl From<&NewClient> for ClientDocument {
    fn from(client: &NewClient) -> Self {
        ClientDocument {
            name: client.name.clone(),
            full_name: client.name.clone(),
            inn: client.inn.clone(),
            comment: client.comment.clone(),
        }
    }
}

/// New `Catalog_Автомобили` record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarDocument {
    #[serde(rename = "Description")]
    pub name: String,
    #[serde(rename = "НаименованиеПолное")]
    pub full_name: String,
    #[serde(rename = "VIN")]
    pub vin: String,
    #[serde(rename = "ГосНомер", skip_serializing_if = "Option::is_none")]
    pub plate: Option<String>,
    #[serde(rename = "Поставщик_Key", skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl From<&NewCar> for CarDocument {
    fn from(car: &NewCar) -> Self {
        CarDocument {
            name: car.name.clone(),
            full_name: car.name.clone(),
            vin: car.vin.clone().unwrap_or_default(),
            plate: car.plate.clone(),
            owner: car.owner.as_ref().map(|o| o.as_str().to_string()),
        }
    }
}

/// Fields of `Document_ЗаказНаряд` an operator may change after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderPatch {
    #[serde(rename = "Состояние_Key", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "ОписаниеПричиныОбращения", skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl From<&OrderUpdate> for OrderPatch {
    fn from(update: &OrderUpdate) -> Self {
        OrderPatch {
            status: update.status.as_ref().map(|s| s.as_str().to_string()),
            comment: update.comment.clone(),
        }
    }
}
