/// Query operators understood by the query compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryOp {
    Exist,
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Nin,
    Within,
    Without,
    Regex,
    Length,
    Size,
    All,
    Day,
    Month,
    Year,
}

impl QueryOp {
    /// Resolve an operator key such as `$gt`. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "$exist" | "$exists" => QueryOp::Exist,
            "$eq" => QueryOp::Eq,
            "$ne" => QueryOp::Ne,
            "$lt" => QueryOp::Lt,
            "$lte" | "$max" => QueryOp::Lte,
            "$gt" => QueryOp::Gt,
            "$gte" | "$min" => QueryOp::Gte,
            "$in" => QueryOp::In,
            "$nin" => QueryOp::Nin,
            "$within" => QueryOp::Within,
            "$without" => QueryOp::Without,
            "$regex" => QueryOp::Regex,
            "$length" => QueryOp::Length,
            "$size" => QueryOp::Size,
            "$all" => QueryOp::All,
            "$day" => QueryOp::Day,
            "$month" => QueryOp::Month,
            "$year" => QueryOp::Year,
            _ => return None,
        })
    }

    /// Operators every type supports.
    pub(crate) fn is_base(&self) -> bool {
        matches!(
            self,
            QueryOp::Exist
                | QueryOp::Eq
                | QueryOp::Ne
                | QueryOp::Lt
                | QueryOp::Lte
                | QueryOp::Gt
                | QueryOp::Gte
                | QueryOp::In
                | QueryOp::Nin
                | QueryOp::Within
                | QueryOp::Without
        )
    }
}

/// Update operators understood by the update compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateOp {
    Set,
    Unset,
    Rename,
    Inc,
    Dec,
    Mul,
    Div,
    Mod,
    Max,
    Min,
    Push,
    Unshift,
    Pull,
    Shift,
    Pop,
    AddToSet,
}

impl UpdateOp {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "$set" => UpdateOp::Set,
            "$unset" => UpdateOp::Unset,
            "$rename" => UpdateOp::Rename,
            "$inc" => UpdateOp::Inc,
            "$dec" => UpdateOp::Dec,
            "$mul" => UpdateOp::Mul,
            "$div" => UpdateOp::Div,
            "$mod" => UpdateOp::Mod,
            "$max" => UpdateOp::Max,
            "$min" => UpdateOp::Min,
            "$push" | "$append" => UpdateOp::Push,
            "$unshift" | "$prepend" => UpdateOp::Unshift,
            "$pull" => UpdateOp::Pull,
            "$shift" => UpdateOp::Shift,
            "$pop" => UpdateOp::Pop,
            "$addToSet" => UpdateOp::AddToSet,
            _ => return None,
        })
    }

    pub(crate) fn is_base(&self) -> bool {
        matches!(self, UpdateOp::Set | UpdateOp::Unset | UpdateOp::Rename)
    }

    pub(crate) fn is_numeric(&self) -> bool {
        matches!(
            self,
            UpdateOp::Inc
                | UpdateOp::Dec
                | UpdateOp::Mul
                | UpdateOp::Div
                | UpdateOp::Mod
                | UpdateOp::Max
                | UpdateOp::Min
        )
    }

    pub(crate) fn is_array(&self) -> bool {
        matches!(
            self,
            UpdateOp::Push
                | UpdateOp::Unshift
                | UpdateOp::Pull
                | UpdateOp::Shift
                | UpdateOp::Pop
                | UpdateOp::AddToSet
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            UpdateOp::Set => "$set",
            UpdateOp::Unset => "$unset",
            UpdateOp::Rename => "$rename",
            UpdateOp::Inc => "$inc",
            UpdateOp::Dec => "$dec",
            UpdateOp::Mul => "$mul",
            UpdateOp::Div => "$div",
            UpdateOp::Mod => "$mod",
            UpdateOp::Max => "$max",
            UpdateOp::Min => "$min",
            UpdateOp::Push => "$push",
            UpdateOp::Unshift => "$unshift",
            UpdateOp::Pull => "$pull",
            UpdateOp::Shift => "$shift",
            UpdateOp::Pop => "$pop",
            UpdateOp::AddToSet => "$addToSet",
        }
    }
}
