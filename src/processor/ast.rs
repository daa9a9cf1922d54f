//! Typed command and expression trees for one script, decoded from the
//! editor's nested JSON arrays.

/// Blocks are stored per script and referenced by index; several
/// commands may point at the same block.
pub type Block = Vec<Cmd>;

/// Declares a closed opcode enum together with its wire names.
macro_rules! opcodes {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($text => Some($name::$variant),)*
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)*
                }
            }
        }
    };
}

opcodes! {
    /// Builtin commands that only have a side effect.
    Effect {
        Goto => "goto",
        Shake => "shake",
        Fin => "fin",
        Hide => "hide",
        Draw => "draw",
        Bpm => "bpm",
        Sound => "sound",
        Invert => "invert",
        Frame => "frame",
        Fill => "fill",
        Swap => "swap",
        Label => "label",
        Restore => "restore",
        Store => "store",
        Toss => "toss",
        Wait => "wait",
        Say => "say",
        Ask => "ask",
        Menu => "menu",
        Option => "option",
        Act => "act",
        Loop => "loop",
        Once => "once",
        Stop => "stop",
        Ignore => "ignore",
        Listen => "listen",
        Log => "log",
        Dump => "dump",
        Window => "window",
        Crop => "crop",
        Play => "play",
    }
}

opcodes! {
    /// Builtin expressions that produce a value.
    ValueOp {
        Type => "type",
        Solid => "solid",
        Frame => "frame",
        Floor => "floor",
        Round => "round",
        Ceil => "ceil",
        Invert => "invert",
        Name => "name",
        Random => "random",
        Sine => "sine",
        Cosine => "cosine",
        Tangent => "tangent",
        Degrees => "degrees",
        Radians => "radians",
        Lpad => "lpad",
        Rpad => "rpad",
    }
}

opcodes! {
    Compare {
        Lt => "lt",
        Lte => "lte",
        Gt => "gt",
        Gte => "gte",
        Eq => "eq",
        Neq => "neq",
    }
}

impl Compare {
    pub fn symbol(self) -> &'static str {
        match self {
            Compare::Lt => "<",
            Compare::Lte => "<=",
            Compare::Gt => ">",
            Compare::Gte => ">=",
            Compare::Eq => "==",
            Compare::Neq => "~=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
}

impl AssignOp {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "set" => Some(AssignOp::Set),
            "add" => Some(AssignOp::Add),
            "sub" => Some(AssignOp::Sub),
            "mul" => Some(AssignOp::Mul),
            "div" => Some(AssignOp::Div),
            _ => None,
        }
    }

    /// Arithmetic operator, `None` for a plain store.
    pub fn operator(self) -> Option<&'static str> {
        match self {
            AssignOp::Set => None,
            AssignOp::Add => Some("+"),
            AssignOp::Sub => Some("-"),
            AssignOp::Mul => Some("*"),
            AssignOp::Div => Some("/"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str(String),
    Number(serde_json::Number),
    Bool(bool),
    Nil,
    /// Variable read by name.
    Get(String),
    /// A tile name resolved to its id at compile time; the name is kept
    /// only for the annotation in the output.
    FoldedId { id: i64, name: String },
    /// Literal fragments and sub-expressions concatenated in order.
    Format(Vec<Expr>),
    Embed(Box<Expr>),
    /// Coordinate pair argument group.
    Xy(Box<Expr>, Box<Expr>),
    /// Rectangle argument group: x, y, w and usually h.
    Rect(Vec<Expr>),
    Name(Vec<Expr>),
    Builtin { op: ValueOp, args: Vec<Expr> },
    /// Deferred callback built from a block.
    Subroutine(usize),
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub op: Compare,
    pub left: Expr,
    pub right: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FollowUp {
    ElseIf { comparison: Comparison, block: usize },
    Else { block: usize },
}

/// Object whose function table a `tell` body dispatches against.
#[derive(Debug, Clone, PartialEq)]
pub enum TellTarget {
    /// Occupant of a room tile.
    At(Expr, Expr),
    Room,
    Player,
    Game,
    /// Anything else is left to the runtime.
    Named(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    Noop,
    Comment,
    CommentContinued,
    /// Early return from the enclosing event.
    Done,
    Assign {
        target: String,
        op: AssignOp,
        value: Expr,
    },
    Increment(String),
    Decrement(String),
    If {
        comparison: Comparison,
        block: usize,
        follow: Vec<FollowUp>,
    },
    While {
        comparison: Comparison,
        block: usize,
    },
    Call(Expr),
    Emit(Expr),
    Mimic(Expr),
    Tell {
        target: TellTarget,
        block: usize,
    },
    Effect {
        op: Effect,
        args: Vec<Expr>,
    },
    Unknown(String),
}

impl Cmd {
    /// Commands that never produce code of their own.
    pub fn is_decoration(&self) -> bool {
        matches!(self, Cmd::Noop | Cmd::Comment | Cmd::CommentContinued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_symbols() {
        let test_cases = vec![
            ("lt", "<"),
            ("lte", "<="),
            ("gt", ">"),
            ("gte", ">="),
            ("eq", "=="),
            ("neq", "~="),
        ];

        for (code, symbol) in test_cases {
            let op = Compare::from_name(code).unwrap();
            assert_eq!(op.symbol(), symbol);
            assert_eq!(op.name(), code);
        }
        assert_eq!(Compare::from_name("approx"), None);
    }

    #[test]
    fn test_opcode_tables_round_trip_names() {
        for op in Effect::ALL {
            assert_eq!(Effect::from_name(op.name()), Some(*op));
        }
        for op in ValueOp::ALL {
            assert_eq!(ValueOp::from_name(op.name()), Some(*op));
        }
        assert_eq!(Effect::from_name("tell"), None);
    }
}
