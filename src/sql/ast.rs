/// A complete statement: one select with optional ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub body: Select,
    pub order_by: Vec<OrderBy>,
}

impl Query {
    pub fn new(body: Select) -> Self {
        Self {
            body,
            order_by: Vec::new(),
        }
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub projection: Vec<SelectItem>,
    pub from: TableRef,
    pub joins: Vec<Join>,
    pub selection: Option<Expr>,
}

impl Select {
    pub fn new(from: TableRef) -> Self {
        Self {
            projection: Vec::new(),
            from,
            joins: Vec::new(),
            selection: None,
        }
    }

    pub fn project(mut self, items: impl IntoIterator<Item = SelectItem>) -> Self {
        self.projection.extend(items);
        self
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn filter(mut self, predicate: Expr) -> Self {
        self.selection = Some(predicate);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Wildcard,
    Expr { expr: Expr, alias: Option<String> },
}

impl SelectItem {
    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        SelectItem::Expr {
            expr,
            alias: Some(alias.into()),
        }
    }

    pub fn unnamed(expr: Expr) -> Self {
        SelectItem::Expr { expr, alias: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableRef {
    /// An existing relation's query text under an alias
    Derived { plan: String, alias: String },
    /// A select built in this tree, nested under an alias
    Subquery { select: Box<Select>, alias: String },
}

impl TableRef {
    pub fn subquery(select: Select, alias: impl Into<String>) -> Self {
        TableRef::Subquery {
            select: Box::new(select),
            alias: alias.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub operator: JoinOperator,
    pub table: TableRef,
    pub constraint: JoinConstraint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOperator {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Semi,
    Anti,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinConstraint {
    On(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    GtEq,
    LtEq,
    Plus,
    Minus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    /// `TRUE`, the value of an empty conjunction
    True,
    /// `INTERVAL '<quantity> <unit>'`; `unit` comes from a closed set of names
    Interval { quantity: u64, unit: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column {
        qualifier: Option<String>,
        name: String,
    },
    Literal(Literal),
    Binary {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    And(Vec<Expr>),
    IsNotNull(Box<Expr>),
    Exists {
        subquery: Box<Select>,
        negated: bool,
    },
    Coalesce(Vec<Expr>),
    Case {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    RowNumber {
        partition_by: Vec<Expr>,
        order_by: Vec<OrderBy>,
    },
}

impl Expr {
    pub fn column(qualifier: &str, name: &str) -> Self {
        Expr::Column {
            qualifier: Some(qualifier.to_string()),
            name: name.to_string(),
        }
    }

    pub fn integer(value: i64) -> Self {
        Expr::Literal(Literal::Integer(value))
    }

    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOperator::Eq, right)
    }

    /// Conjunction of `predicates`; nested conjunctions are flattened, an empty
    /// list is `TRUE` and a single predicate is returned as is.
    pub fn and(predicates: impl IntoIterator<Item = Expr>) -> Self {
        let mut flat = Vec::new();
        for predicate in predicates {
            match predicate {
                Expr::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Expr::Literal(Literal::True),
            1 => flat.remove(0),
            _ => Expr::And(flat),
        }
    }

    pub fn is_not_null(expr: Expr) -> Self {
        Expr::IsNotNull(Box::new(expr))
    }

    pub fn exists(subquery: Select, negated: bool) -> Self {
        Expr::Exists {
            subquery: Box::new(subquery),
            negated,
        }
    }

    pub fn case(condition: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::Case {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: Expr,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(expr: Expr) -> Self {
        Self { expr, descending: false }
    }

    pub fn desc(expr: Expr) -> Self {
        Self { expr, descending: true }
    }
}
