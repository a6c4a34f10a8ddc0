use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One payroll row as served by `/admin/riders` and `/my/payments`.
///
/// Every field keeps the raw JSON value the API sent (`null` when absent).
/// Coercion to numbers, dates, or display text happens at the point of use,
/// so a record is never rewritten on its way through the dashboard.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentRecord {
    pub sno: Value,
    pub careem_captain_id: Value,
    pub person_code: Value,
    pub card_no: Value,
    pub designation: Value,
    pub doj: Value,
    pub name: Value,
    pub total_working_hours: Value,
    pub no_of_days: Value,
    pub total_orders: Value,
    pub actual_order_pay: Value,
    pub total_excess_pay_bonus_and_dist_pay: Value,
    pub gross_pay: Value,
    pub total_cod_cash_on_delivery: Value,
    pub vendor_fee: Value,
    pub traffic_fine: Value,
    pub loan_saladv_os_fine: Value,
    pub training_fee: Value,
    pub net_salary: Value,
    pub remarks: Value,
    pub imported_at: Value,
    /// Fields the API added that this client does not know about yet.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NumericField {
    TotalWorkingHours,
    NoOfDays,
    TotalOrders,
    ActualOrderPay,
    ExcessPay,
    GrossPay,
    CashOnDelivery,
    VendorFee,
    TrafficFine,
    LoanAdvanceFine,
    TrainingFee,
    NetSalary,
}

impl NumericField {
    pub const COUNT: usize = 12;

    pub const ALL: [NumericField; NumericField::COUNT] = [
        NumericField::TotalWorkingHours,
        NumericField::NoOfDays,
        NumericField::TotalOrders,
        NumericField::ActualOrderPay,
        NumericField::ExcessPay,
        NumericField::GrossPay,
        NumericField::CashOnDelivery,
        NumericField::VendorFee,
        NumericField::TrafficFine,
        NumericField::LoanAdvanceFine,
        NumericField::TrainingFee,
        NumericField::NetSalary,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::TotalWorkingHours => "total_working_hours",
            Self::NoOfDays => "no_of_days",
            Self::TotalOrders => "total_orders",
            Self::ActualOrderPay => "actual_order_pay",
            Self::ExcessPay => "total_excess_pay_bonus_and_dist_pay",
            Self::GrossPay => "gross_pay",
            Self::CashOnDelivery => "total_cod_cash_on_delivery",
            Self::VendorFee => "vendor_fee",
            Self::TrafficFine => "traffic_fine",
            Self::LoanAdvanceFine => "loan_saladv_os_fine",
            Self::TrainingFee => "training_fee",
            Self::NetSalary => "net_salary",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::TotalWorkingHours => "Working Hours",
            Self::NoOfDays => "Days",
            Self::TotalOrders => "Orders",
            Self::ActualOrderPay => "Order Pay",
            Self::ExcessPay => "Excess Pay (Bonus & Dist.)",
            Self::GrossPay => "Gross Pay",
            Self::CashOnDelivery => "COD",
            Self::VendorFee => "Vendor Fee",
            Self::TrafficFine => "Traffic Fine",
            Self::LoanAdvanceFine => "Loan, Sal.Adv, OS Fine",
            Self::TrainingFee => "Training Fee",
            Self::NetSalary => "Net Salary",
        }
    }
}

/// Column order shared by the payments table and both export formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaymentColumn {
    Sno,
    CaptainId,
    PersonCode,
    CardNo,
    Designation,
    JoinDate,
    Name,
    Numeric(NumericField),
    Remarks,
}

impl PaymentColumn {
    pub const ALL: [PaymentColumn; 20] = [
        PaymentColumn::Sno,
        PaymentColumn::CaptainId,
        PaymentColumn::PersonCode,
        PaymentColumn::CardNo,
        PaymentColumn::Designation,
        PaymentColumn::JoinDate,
        PaymentColumn::Name,
        PaymentColumn::Numeric(NumericField::TotalWorkingHours),
        PaymentColumn::Numeric(NumericField::NoOfDays),
        PaymentColumn::Numeric(NumericField::TotalOrders),
        PaymentColumn::Numeric(NumericField::ActualOrderPay),
        PaymentColumn::Numeric(NumericField::ExcessPay),
        PaymentColumn::Numeric(NumericField::GrossPay),
        PaymentColumn::Numeric(NumericField::CashOnDelivery),
        PaymentColumn::Numeric(NumericField::VendorFee),
        PaymentColumn::Numeric(NumericField::TrafficFine),
        PaymentColumn::Numeric(NumericField::LoanAdvanceFine),
        PaymentColumn::Numeric(NumericField::TrainingFee),
        PaymentColumn::Numeric(NumericField::NetSalary),
        PaymentColumn::Remarks,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Sno => "sno",
            Self::CaptainId => "careem_captain_id",
            Self::PersonCode => "person_code",
            Self::CardNo => "card_no",
            Self::Designation => "designation",
            Self::JoinDate => "doj",
            Self::Name => "name",
            Self::Numeric(field) => field.key(),
            Self::Remarks => "remarks",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Sno => "S.No",
            Self::CaptainId => "Captain ID",
            Self::PersonCode => "Person Code",
            Self::CardNo => "Card No",
            Self::Designation => "Designation",
            Self::JoinDate => "DOJ",
            Self::Name => "Name",
            Self::Numeric(field) => field.label(),
            Self::Remarks => "Remarks",
        }
    }
}

impl PaymentRecord {
    pub fn numeric(&self, field: NumericField) -> &Value {
        match field {
            NumericField::TotalWorkingHours => &self.total_working_hours,
            NumericField::NoOfDays => &self.no_of_days,
            NumericField::TotalOrders => &self.total_orders,
            NumericField::ActualOrderPay => &self.actual_order_pay,
            NumericField::ExcessPay => &self.total_excess_pay_bonus_and_dist_pay,
            NumericField::GrossPay => &self.gross_pay,
            NumericField::CashOnDelivery => &self.total_cod_cash_on_delivery,
            NumericField::VendorFee => &self.vendor_fee,
            NumericField::TrafficFine => &self.traffic_fine,
            NumericField::LoanAdvanceFine => &self.loan_saladv_os_fine,
            NumericField::TrainingFee => &self.training_fee,
            NumericField::NetSalary => &self.net_salary,
        }
    }

    pub fn value(&self, column: PaymentColumn) -> &Value {
        match column {
            PaymentColumn::Sno => &self.sno,
            PaymentColumn::CaptainId => &self.careem_captain_id,
            PaymentColumn::PersonCode => &self.person_code,
            PaymentColumn::CardNo => &self.card_no,
            PaymentColumn::Designation => &self.designation,
            PaymentColumn::JoinDate => &self.doj,
            PaymentColumn::Name => &self.name,
            PaymentColumn::Numeric(field) => self.numeric(field),
            PaymentColumn::Remarks => &self.remarks,
        }
    }
}
