//! Return types of well-known JDK, Guava and AssertJ members.
//!
//! Owners are written with their type parameters (`Optional<T>`); return
//! types may refer to those parameters, or to `$0` for "the type of the first
//! argument".

/// `(owner, method, return type)` for instance methods.
pub(super) const INSTANCE_METHODS: &[(&str, &str, &str)] = &[
    ("Object", "equals", "boolean"),
    ("Object", "hashCode", "int"),
    ("Object", "toString", "String"),
    ("Object", "getClass", "Class<?>"),
    ("Comparable<T>", "compareTo", "int"),
    ("Optional<T>", "isPresent", "boolean"),
    ("Optional<T>", "isEmpty", "boolean"),
    ("Optional<T>", "get", "T"),
    ("Optional<T>", "orElseThrow", "T"),
    ("Optional<T>", "orElse", "T"),
    ("Optional<T>", "orElseGet", "T"),
    ("Optional<T>", "filter", "Optional<T>"),
    ("Optional<T>", "or", "Optional<T>"),
    ("Optional<T>", "stream", "Stream<T>"),
    ("Iterable<T>", "iterator", "Iterator<T>"),
    ("Iterator<E>", "hasNext", "boolean"),
    ("Iterator<E>", "next", "E"),
    ("Collection<E>", "size", "int"),
    ("Collection<E>", "isEmpty", "boolean"),
    ("Collection<E>", "contains", "boolean"),
    ("Collection<E>", "containsAll", "boolean"),
    ("Collection<E>", "add", "boolean"),
    ("Collection<E>", "remove", "boolean"),
    ("Collection<E>", "stream", "Stream<E>"),
    ("Collection<E>", "toArray", "Object[]"),
    ("List<E>", "get", "E"),
    ("List<E>", "getFirst", "E"),
    ("List<E>", "getLast", "E"),
    ("List<E>", "indexOf", "int"),
    ("List<E>", "subList", "List<E>"),
    ("List<E>", "reversed", "List<E>"),
    ("Deque<E>", "peekFirst", "E"),
    ("Deque<E>", "peekLast", "E"),
    ("Queue<E>", "peek", "E"),
    ("Queue<E>", "poll", "E"),
    ("Map<K, V>", "size", "int"),
    ("Map<K, V>", "isEmpty", "boolean"),
    ("Map<K, V>", "get", "V"),
    ("Map<K, V>", "getOrDefault", "V"),
    ("Map<K, V>", "put", "V"),
    ("Map<K, V>", "containsKey", "boolean"),
    ("Map<K, V>", "containsValue", "boolean"),
    ("Map<K, V>", "keySet", "Set<K>"),
    ("Map<K, V>", "values", "Collection<V>"),
    ("Map<K, V>", "entrySet", "Set<Map.Entry<K, V>>"),
    ("Entry<K, V>", "getKey", "K"),
    ("Entry<K, V>", "getValue", "V"),
    ("CharSequence", "length", "int"),
    ("CharSequence", "charAt", "char"),
    ("CharSequence", "isEmpty", "boolean"),
    ("String", "isBlank", "boolean"),
    ("String", "substring", "String"),
    ("String", "trim", "String"),
    ("String", "strip", "String"),
    ("String", "toLowerCase", "String"),
    ("String", "toUpperCase", "String"),
    ("String", "concat", "String"),
    ("String", "replace", "String"),
    ("String", "repeat", "String"),
    ("String", "equalsIgnoreCase", "boolean"),
    ("String", "startsWith", "boolean"),
    ("String", "endsWith", "boolean"),
    ("String", "contains", "boolean"),
    ("String", "indexOf", "int"),
    ("String", "split", "String[]"),
    ("String", "getBytes", "byte[]"),
    ("String", "chars", "IntStream"),
    ("StringBuilder", "append", "StringBuilder"),
    ("Stream<T>", "count", "long"),
    ("Stream<T>", "findFirst", "Optional<T>"),
    ("Stream<T>", "findAny", "Optional<T>"),
    ("Stream<T>", "filter", "Stream<T>"),
    ("Stream<T>", "sorted", "Stream<T>"),
    ("Stream<T>", "distinct", "Stream<T>"),
    ("Stream<T>", "limit", "Stream<T>"),
    ("Stream<T>", "skip", "Stream<T>"),
    ("Stream<T>", "anyMatch", "boolean"),
    ("Stream<T>", "allMatch", "boolean"),
    ("Stream<T>", "noneMatch", "boolean"),
    ("Stream<T>", "toList", "List<T>"),
    ("Instant", "isBefore", "boolean"),
    ("Instant", "isAfter", "boolean"),
    ("Instant", "plus", "Instant"),
    ("Instant", "minus", "Instant"),
    ("Instant", "toEpochMilli", "long"),
    ("Instant", "getEpochSecond", "long"),
    ("ChronoLocalDate", "isBefore", "boolean"),
    ("ChronoLocalDate", "isAfter", "boolean"),
    ("ChronoLocalDate", "isEqual", "boolean"),
    ("Duration", "isZero", "boolean"),
    ("Duration", "isNegative", "boolean"),
    ("Duration", "toMillis", "long"),
    ("Duration", "getSeconds", "long"),
    ("Integer", "intValue", "int"),
    ("Long", "longValue", "long"),
    ("Boolean", "booleanValue", "boolean"),
    ("BigDecimal", "signum", "int"),
    ("BigInteger", "signum", "int"),
];

/// `(owner, method, return type)` for static methods.
pub(super) const STATIC_METHODS: &[(&str, &str, &str)] = &[
    ("Objects", "equals", "boolean"),
    ("Objects", "hash", "int"),
    ("Objects", "hashCode", "int"),
    ("Objects", "isNull", "boolean"),
    ("Objects", "nonNull", "boolean"),
    ("Objects", "toString", "String"),
    ("Objects", "requireNonNull", "$0"),
    ("Objects", "requireNonNullElse", "$0"),
    ("Math", "abs", "$0"),
    ("Math", "max", "$0"),
    ("Math", "min", "$0"),
    ("String", "valueOf", "String"),
    ("String", "format", "String"),
    ("String", "join", "String"),
    ("Integer", "valueOf", "Integer"),
    ("Integer", "parseInt", "int"),
    ("Integer", "compare", "int"),
    ("Long", "valueOf", "Long"),
    ("Long", "parseLong", "long"),
    ("Long", "compare", "int"),
    ("Boolean", "valueOf", "Boolean"),
    ("Boolean", "parseBoolean", "boolean"),
    ("System", "currentTimeMillis", "long"),
    ("System", "nanoTime", "long"),
    ("System", "lineSeparator", "String"),
    ("System", "getProperty", "String"),
    ("Collections", "emptyList", "List"),
    ("Collections", "emptySet", "Set"),
    ("Collections", "emptyMap", "Map"),
    ("Collections", "singletonList", "List"),
    ("Collections", "singleton", "Set"),
    ("Collections", "unmodifiableList", "List"),
    ("Collections", "unmodifiableSet", "Set"),
    ("Collections", "unmodifiableMap", "Map"),
    ("Arrays", "asList", "List"),
    ("Arrays", "stream", "Stream"),
    ("Arrays", "equals", "boolean"),
    ("Arrays", "toString", "String"),
    ("List", "of", "List"),
    ("List", "copyOf", "List"),
    ("Set", "of", "Set"),
    ("Set", "copyOf", "Set"),
    ("Map", "of", "Map"),
    ("Map", "copyOf", "Map"),
    ("Stream", "of", "Stream"),
    ("Stream", "empty", "Stream"),
    ("Optional", "of", "Optional"),
    ("Optional", "ofNullable", "Optional"),
    ("Optional", "empty", "Optional"),
    ("ImmutableList", "of", "ImmutableList"),
    ("ImmutableList", "copyOf", "ImmutableList"),
    ("ImmutableSet", "of", "ImmutableSet"),
    ("ImmutableSet", "copyOf", "ImmutableSet"),
    ("ImmutableMap", "of", "ImmutableMap"),
    ("ImmutableMap", "copyOf", "ImmutableMap"),
    ("Instant", "now", "Instant"),
    ("Instant", "ofEpochMilli", "Instant"),
    ("Instant", "ofEpochSecond", "Instant"),
    ("Instant", "parse", "Instant"),
    ("Duration", "ofMillis", "Duration"),
    ("Duration", "ofSeconds", "Duration"),
    ("Duration", "ofMinutes", "Duration"),
    ("Duration", "ofHours", "Duration"),
    ("Duration", "ofDays", "Duration"),
    ("Duration", "between", "Duration"),
    ("LocalDate", "now", "LocalDate"),
    ("LocalDate", "of", "LocalDate"),
];

/// `(owner, field, type)` for static constants.
pub(super) const STATIC_FIELDS: &[(&str, &str, &str)] = &[
    ("Collections", "EMPTY_LIST", "List"),
    ("Collections", "EMPTY_SET", "Set"),
    ("Collections", "EMPTY_MAP", "Map"),
    ("Integer", "MAX_VALUE", "int"),
    ("Integer", "MIN_VALUE", "int"),
    ("Long", "MAX_VALUE", "long"),
    ("Long", "MIN_VALUE", "long"),
    ("Boolean", "TRUE", "Boolean"),
    ("Boolean", "FALSE", "Boolean"),
    ("Instant", "EPOCH", "Instant"),
    ("Instant", "MIN", "Instant"),
    ("Instant", "MAX", "Instant"),
    ("Duration", "ZERO", "Duration"),
    ("BigDecimal", "ZERO", "BigDecimal"),
    ("BigDecimal", "ONE", "BigDecimal"),
    ("BigDecimal", "TEN", "BigDecimal"),
    ("BigInteger", "ZERO", "BigInteger"),
    ("BigInteger", "ONE", "BigInteger"),
    ("BigInteger", "TEN", "BigInteger"),
    ("String", "CASE_INSENSITIVE_ORDER", "Comparator<String>"),
    ("System", "out", "PrintStream"),
    ("System", "err", "PrintStream"),
];

/// `(type, supertypes)` for the default type hierarchy.
pub(super) const SUPERTYPES: &[(&str, &[&str])] = &[
    ("Iterable", &[]),
    ("Collection", &["Iterable"]),
    ("SequencedCollection", &["Collection"]),
    ("List", &["SequencedCollection"]),
    ("Set", &["Collection"]),
    ("SequencedSet", &["Set", "SequencedCollection"]),
    ("SortedSet", &["SequencedSet"]),
    ("NavigableSet", &["SortedSet"]),
    ("Queue", &["Collection"]),
    ("Deque", &["Queue", "SequencedCollection"]),
    ("ArrayList", &["List"]),
    ("LinkedList", &["List", "Deque"]),
    ("CopyOnWriteArrayList", &["List"]),
    ("HashSet", &["Set"]),
    ("LinkedHashSet", &["SequencedSet"]),
    ("TreeSet", &["NavigableSet"]),
    ("EnumSet", &["Set"]),
    ("ArrayDeque", &["Deque"]),
    ("PriorityQueue", &["Queue"]),
    ("Map", &[]),
    ("SequencedMap", &["Map"]),
    ("SortedMap", &["SequencedMap"]),
    ("NavigableMap", &["SortedMap"]),
    ("ConcurrentMap", &["Map"]),
    ("HashMap", &["Map"]),
    ("LinkedHashMap", &["HashMap", "SequencedMap"]),
    ("TreeMap", &["NavigableMap"]),
    ("EnumMap", &["Map"]),
    ("ConcurrentHashMap", &["ConcurrentMap"]),
    ("ImmutableCollection", &["Collection"]),
    ("ImmutableList", &["ImmutableCollection", "List"]),
    ("ImmutableSet", &["ImmutableCollection", "Set"]),
    ("ImmutableSortedSet", &["ImmutableSet", "NavigableSet"]),
    ("ImmutableMap", &["Map"]),
    ("ImmutableSortedMap", &["ImmutableMap", "NavigableMap"]),
    ("ImmutableMultiset", &["ImmutableCollection"]),
    ("CharSequence", &[]),
    ("String", &["CharSequence", "Comparable"]),
    ("StringBuilder", &["CharSequence"]),
    ("Number", &[]),
    ("Integer", &["Number", "Comparable"]),
    ("Long", &["Number", "Comparable"]),
    ("Short", &["Number", "Comparable"]),
    ("Byte", &["Number", "Comparable"]),
    ("Double", &["Number", "Comparable"]),
    ("Float", &["Number", "Comparable"]),
    ("BigDecimal", &["Number", "Comparable"]),
    ("BigInteger", &["Number", "Comparable"]),
    ("Boolean", &["Comparable"]),
    ("Character", &["Comparable"]),
    ("Temporal", &[]),
    ("ChronoLocalDate", &["Temporal", "Comparable"]),
    ("Instant", &["Temporal", "Comparable"]),
    ("LocalDate", &["ChronoLocalDate"]),
    ("LocalDateTime", &["Temporal", "Comparable"]),
    ("ZonedDateTime", &["Temporal", "Comparable"]),
    ("OffsetDateTime", &["Temporal", "Comparable"]),
    ("TemporalAmount", &[]),
    ("Duration", &["TemporalAmount", "Comparable"]),
    ("Period", &["TemporalAmount"]),
    ("BaseStream", &[]),
    ("Stream", &["BaseStream"]),
    ("IntStream", &["BaseStream"]),
    ("LongStream", &["BaseStream"]),
    ("DoubleStream", &["BaseStream"]),
    ("Throwable", &[]),
    ("Exception", &["Throwable"]),
    ("Error", &["Throwable"]),
    ("RuntimeException", &["Exception"]),
    ("IllegalArgumentException", &["RuntimeException"]),
    ("IllegalStateException", &["RuntimeException"]),
    ("NullPointerException", &["RuntimeException"]),
    ("UnsupportedOperationException", &["RuntimeException"]),
    ("UncheckedIOException", &["RuntimeException"]),
    ("IOException", &["Exception"]),
    ("Entry", &[]),
];

/// `(package, types)` for classes that templates refer to by simple name.
pub(super) const PACKAGES: &[(&str, &[&str])] = &[
    (
        "java.lang",
        &["Object", "String", "Integer", "Long", "Boolean", "Math", "System", "CharSequence"],
    ),
    (
        "java.util",
        &[
            "Arrays", "Collections", "Objects", "Optional", "List", "Set", "Map", "Collection",
            "Iterator", "Comparator",
        ],
    ),
    ("java.util.stream", &["Stream", "IntStream", "LongStream", "Collectors"]),
    ("java.time", &["Instant", "Duration", "LocalDate"]),
    ("java.math", &["BigDecimal", "BigInteger"]),
    ("com.google.common.collect", &["ImmutableList", "ImmutableSet", "ImmutableMap"]),
    ("org.assertj.core.api", &["Assertions"]),
];
