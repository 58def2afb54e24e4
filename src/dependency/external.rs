//! This module contains the models of external functions: functions whose
//! bodies the host does not execute, such as those of the C library.
//!
//! Only well-known functions are modelled. Calls to anything else produce a
//! return value that depends on nothing.

/// How the return value of an external function relates to its arguments.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExternalModel {
    /// Returns a pointer to a fresh allocation.
    Allocation(AllocationSize),

    /// Returns a pointer to memory owned by the runtime, of unknown size.
    ForeignPointer,

    /// Returns a pointer into the memory pointed to by the given argument.
    PointerInto(usize),

    /// Returns a value computed from the given arguments.
    DependsOn(&'static [usize]),

    /// Returns a value that depends on nothing the engine tracks.
    Unconstrained,
}

/// Where the size of an allocating function's allocation comes from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AllocationSize {
    /// The size is the given argument.
    Argument(usize),

    /// The size is the product of the given arguments.
    Product(usize, usize),
}

impl AllocationSize {
    /// Computes the size from the constant values of the `arguments`, yielding
    /// zero when the size is not a constant.
    #[must_use]
    pub fn evaluate(self, arguments: &[Option<u64>]) -> u64 {
        let argument = |i: usize| arguments.get(i).copied().flatten();
        match self {
            Self::Argument(i) => argument(i).unwrap_or(0),
            Self::Product(i, j) => argument(i)
                .zip(argument(j))
                .and_then(|(a, b)| a.checked_mul(b))
                .unwrap_or(0),
        }
    }
}

/// Gets the model of the external function called `name`, if it is known.
#[must_use]
pub fn model(name: &str) -> Option<ExternalModel> {
    let model = match name {
        "malloc" | "valloc" | "_Znwm" | "_Znam" | "__cxa_allocate_exception" => {
            ExternalModel::Allocation(AllocationSize::Argument(0))
        }
        "calloc" => ExternalModel::Allocation(AllocationSize::Product(0, 1)),
        "realloc" | "memalign" | "aligned_alloc" => {
            ExternalModel::Allocation(AllocationSize::Argument(1))
        }
        "getenv" | "strerror" | "setlocale" | "localtime" | "gmtime" | "getpwnam" | "getpwuid"
        | "getgrnam" | "getgrgid" | "fopen" | "fdopen" | "tmpfile" | "opendir" | "readdir"
        | "__errno_location" | "__ctype_b_loc" | "__ctype_tolower_loc"
        | "__ctype_toupper_loc" => ExternalModel::ForeignPointer,
        "memcpy" | "memmove" | "memset" | "strcpy" | "strncpy" | "strcat" | "strncat" | "fgets"
        | "strchr" | "strrchr" | "strstr" | "memchr" | "strpbrk" => ExternalModel::PointerInto(0),
        "strlen" | "strnlen" | "atoi" | "atol" | "atoll" | "strtol" | "strtoul" | "strtoll"
        | "strtoull" | "toupper" | "tolower" | "isalpha" | "isdigit" | "isspace" | "isupper"
        | "islower" | "isalnum" | "isprint" | "abs" | "labs" | "llabs" | "htonl" | "htons"
        | "ntohl" | "ntohs" => ExternalModel::DependsOn(&[0]),
        "strcmp" | "strncmp" | "strcasecmp" | "strncasecmp" | "memcmp" | "strspn"
        | "strcspn" => ExternalModel::DependsOn(&[0, 1]),
        "rand" | "random" | "time" | "clock" | "getchar" | "getc" | "fgetc" | "getpid"
        | "getuid" | "printf" | "fprintf" | "sprintf" | "snprintf" | "puts" | "fputs"
        | "putchar" | "fputc" | "free" | "fclose" | "fflush" | "read" | "write" | "open"
        | "close" | "exit" | "abort" => ExternalModel::Unconstrained,
        _ => return None,
    };
    Some(model)
}

#[cfg(test)]
mod test {
    use crate::dependency::external::{model, AllocationSize, ExternalModel};

    #[test]
    fn allocation_sizes() {
        assert_eq!(AllocationSize::Argument(0).evaluate(&[Some(16)]), 16);
        assert_eq!(AllocationSize::Argument(1).evaluate(&[Some(16)]), 0);
        assert_eq!(AllocationSize::Product(0, 1).evaluate(&[Some(4), Some(8)]), 32);
        assert_eq!(AllocationSize::Product(0, 1).evaluate(&[Some(4), None]), 0);
        assert_eq!(AllocationSize::Product(0, 1).evaluate(&[Some(u64::MAX), Some(2)]), 0);
    }

    #[test]
    fn known_functions_are_modelled() {
        assert_eq!(
            model("calloc"),
            Some(ExternalModel::Allocation(AllocationSize::Product(0, 1)))
        );
        assert_eq!(model("strcpy"), Some(ExternalModel::PointerInto(0)));
        assert_eq!(model("getenv"), Some(ExternalModel::ForeignPointer));
        assert_eq!(model("frobnicate"), None);
    }
}
